// src/seed.rs

use crate::{
    config::Config,
    error::AppError,
    models::user::{NewUser, ROLE_ADMIN},
    store::UserStore,
    utils::hash::hash_password,
};

/// Creates the administrator account from config if it does not exist yet.
pub async fn seed_admin_user(users: &dyn UserStore, config: &Config) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    if users.find_user_by_email(email).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", email);
    users
        .insert_user(NewUser {
            email: email.clone(),
            username: Some("admin".to_string()),
            password: hash_password(password)?,
            role: ROLE_ADMIN.to_string(),
        })
        .await?;
    tracing::info!("Admin user created successfully.");

    Ok(())
}
