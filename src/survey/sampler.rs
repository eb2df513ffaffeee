// src/survey/sampler.rs

use rand::{Rng, seq::SliceRandom};

use crate::models::question::QuestionSummary;

/// Draws up to `count` distinct eligible question ids from the bank.
///
/// Questions without answers are skipped. When the eligible population is no
/// larger than `count`, every eligible question is returned once, shuffled.
/// Otherwise `count` distinct questions are chosen uniformly at random.
pub fn sample<R: Rng + ?Sized>(bank: &[QuestionSummary], count: usize, rng: &mut R) -> Vec<i64> {
    let eligible: Vec<i64> = bank
        .iter()
        .filter(|q| q.is_eligible())
        .map(|q| q.id)
        .collect();

    pick_distinct(&eligible, count, rng)
}

/// Picks `min(count, population.len())` items without replacement.
pub fn pick_distinct<T: Clone, R: Rng + ?Sized>(population: &[T], count: usize, rng: &mut R) -> Vec<T> {
    if count >= population.len() {
        let mut all = population.to_vec();
        all.shuffle(rng);
        return all;
    }

    // Distinct index sampling; always terminates regardless of how close
    // `count` is to the population size.
    rand::seq::index::sample(rng, population.len(), count)
        .into_iter()
        .map(|i| population[i].clone())
        .collect()
}
