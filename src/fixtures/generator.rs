//! Randomized coupon generator.
//!
//! Produces a complete coupon where exactly the requested number of races
//! has the winner among the marked horses. Pool, odds, prize and
//! statistics figures are derived from each other so the result passes
//! every consistency check in [`super::analyzer`].

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::model::*;
use super::FixtureError;

const TRACKS: [&str; 9] = [
    "Bjerke",
    "Jarlsberg",
    "Momarken",
    "Klosterskogen",
    "Forus",
    "Leangen",
    "Biri",
    "Sørlandet",
    "Bergen",
];

const HORSE_NAMES: [&str; 28] = [
    "Månlykke",
    "Stjernegutten",
    "Tangen Haap",
    "Lynet Brage",
    "Bokli Frøya",
    "Mjølner",
    "Odin Tabac",
    "Holmegutten",
    "Alm Svarten",
    "Nordsjø Rapp",
    "Kleppe Slått",
    "Grisle Odin G.R.",
    "Sjur Storm",
    "Vestby Viking",
    "Hovin Prinsen",
    "Ilsa Viktor",
    "Frøy Blesen",
    "Lome Brage",
    "Tekno Eld",
    "Bakke Frigg",
    "Moe Odin",
    "Voje Stella",
    "Solør Kongen",
    "Elding Tor",
    "Fjell Frida",
    "Rappe Ruud",
    "Havglimt",
    "Kvikk Lisa",
];

const MIN_STARTERS: u32 = 8;
const MAX_STARTERS: u32 = 12;
/// Share of the total pool spread across the race pools.
const RACE_POOL_SHARE: u64 = 85;
/// Share of the total pool paid out as prizes.
const PRIZE_POOL_SHARE: u64 = 65;
/// Payout ratio used when turning bet percentages into odds.
const ODDS_PAYOUT_RATIO: f64 = 0.85;
const MIN_ODDS: f64 = 1.1;
/// Largest accepted `target_payout` in kroner.
pub const MAX_TARGET_PAYOUT: u64 = 1_000_000_000;

/// Body of `POST /fixtures/generate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureRequest {
    #[serde(default)]
    pub product: Product,
    /// Races where the winner is marked. Random when absent.
    #[serde(default)]
    pub correct_races: Option<u32>,
    /// Desired payout in whole kroner.
    #[serde(default)]
    pub target_payout: Option<u64>,
    /// Makes the output reproducible.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub track: Option<String>,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Generate a coupon for `request`.
pub fn generate(request: &FixtureRequest) -> Result<Coupon, FixtureError> {
    let product = request.product;
    let races = product.races();

    if let Some(requested) = request.correct_races {
        if requested > races {
            return Err(FixtureError::TooManyCorrect {
                product,
                requested,
                races,
            });
        }
    }
    if request.target_payout == Some(0) {
        return Err(FixtureError::ZeroPayout);
    }
    if let Some(target) = request.target_payout.filter(|&t| t > MAX_TARGET_PAYOUT) {
        return Err(FixtureError::PayoutTooLarge {
            requested: target,
            max: MAX_TARGET_PAYOUT,
        });
    }

    let seed = request.seed.unwrap_or_else(|| rand::rng().random::<u64>());
    let mut rng = StdRng::seed_from_u64(seed);

    let correct = request
        .correct_races
        .unwrap_or_else(|| rng.random_range(0..=races));
    if request.target_payout.is_some() && correct < product.lowest_tier() {
        return Err(FixtureError::UnreachablePayout {
            product,
            correct,
            lowest: product.lowest_tier(),
        });
    }

    debug!(%product, correct, seed, "Generating coupon fixture");

    let mut race_order: Vec<u32> = (1..=races).collect();
    race_order.shuffle(&mut rng);
    let hit_races: Vec<u32> = race_order[..correct as usize].to_vec();

    let total_pool = rng.random_range(2_000..=8_000u64) * 1_000;
    let prize_pool = total_pool * PRIZE_POOL_SHARE / 100;
    let race_pool = total_pool * RACE_POOL_SHARE / 100 / u64::from(races);

    let mut markings = BTreeMap::new();
    let mut race_results = Vec::with_capacity(races as usize);
    for race in 1..=races {
        let hit = hit_races.contains(&race);
        let (result, marked) = generate_race(&mut rng, race, race_pool, hit);
        markings.insert(race.to_string(), marked);
        race_results.push(result);
    }

    let rows: u64 = markings.values().map(|m| m.len() as u64).product();
    let total_cost = product.price_per_row() * Decimal::from(rows);

    let prizes = generate_prizes(&mut rng, product, prize_pool, correct, rows, request.target_payout);
    let payout = tier_key(correct)
        .filter(|_| product.prize_tiers().contains(&correct))
        .and_then(|key| prizes.get(key))
        .map(|prize| prize.amount.saturating_mul(rows))
        .unwrap_or(0);

    let statistics = compute_statistics(&race_results, rows, total_cost);

    let track = request
        .track
        .clone()
        .unwrap_or_else(|| TRACKS[rng.random_range(0..TRACKS.len())].to_string());
    // First Saturday of 2025, then a random week within the year.
    let date = NaiveDate::from_ymd_opt(2025, 1, 4).unwrap_or_default()
        + Duration::weeks(rng.random_range(0..52));

    Ok(Coupon {
        product,
        track,
        date,
        start_time: product.start_time().to_string(),
        bet_details: BetDetails {
            rows,
            price_per_row: product.price_per_row(),
            total_cost,
        },
        pool_info: PoolInfo {
            total_pool,
            prize_pool,
        },
        markings,
        race_results,
        result: CouponResult {
            correct_races: correct,
            total_races: races,
            payout,
            won: payout > 0,
        },
        prizes,
        statistics,
    })
}

/// One race plus the horses marked for it on the coupon.
fn generate_race(rng: &mut StdRng, race: u32, pool_size: u64, hit: bool) -> (RaceResult, Vec<u32>) {
    let starters = rng.random_range(MIN_STARTERS..=MAX_STARTERS);

    let weights: Vec<f64> = (0..starters)
        .map(|_| rng.random_range(1.0f64..6.0).powi(2))
        .collect();
    let percentages = normalize_percentages(&weights);

    let mut names: Vec<&str> = HORSE_NAMES.to_vec();
    names.shuffle(rng);

    // Horse numbers are 1-based start numbers.
    let winner_idx = weighted_index(rng, &percentages);
    let mut others: Vec<usize> = (0..starters as usize).filter(|&i| i != winner_idx).collect();
    others.shuffle(rng);

    let mut positions = vec![0u32; starters as usize];
    positions[winner_idx] = 1;
    for (place, &idx) in others.iter().enumerate() {
        positions[idx] = place as u32 + 2;
    }

    let mut results: Vec<HorseResult> = (0..starters as usize)
        .map(|i| {
            let pct = percentages[i];
            HorseResult {
                position: positions[i],
                horse: i as u32 + 1,
                name: names[i].to_string(),
                odds: round_to((100.0 / pct * ODDS_PAYOUT_RATIO).max(MIN_ODDS), 1),
                percentage_bet: pct,
                amount_bet: (pct / 100.0 * pool_size as f64).round() as u64,
            }
        })
        .collect();
    results.sort_by_key(|h| h.position);

    let winner_horse = results[0].horse;
    let winner_name = results[0].name.clone();
    let winner_odds = results[0].odds;

    let mut by_share: Vec<&HorseResult> = results.iter().collect();
    by_share.sort_by(|a, b| b.percentage_bet.total_cmp(&a.percentage_bet));
    let choice = |h: &HorseResult| Choice {
        horse: h.horse,
        percentage: h.percentage_bet,
    };
    let betting_distribution = BettingDistribution {
        favorite: choice(by_share[0]),
        second_choice: choice(by_share[1]),
        third_choice: choice(by_share[2]),
    };

    let mut losers: Vec<u32> = results
        .iter()
        .map(|h| h.horse)
        .filter(|&h| h != winner_horse)
        .collect();
    losers.shuffle(rng);
    let mut marked: Vec<u32> = if hit {
        let extra = rng.random_range(2..=5usize);
        let mut m = vec![winner_horse];
        m.extend_from_slice(&losers[..extra]);
        m
    } else {
        let count = rng.random_range(2..=5usize);
        losers[..count].to_vec()
    };
    marked.sort_unstable();

    let result = RaceResult {
        race,
        total_starters: starters,
        pool_size,
        winner: winner_horse,
        winner_name,
        winner_odds,
        hit,
        results,
        betting_distribution,
    };
    (result, marked)
}

/// Weights to percentages with one decimal that sum to 100.
fn normalize_percentages(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    let mut pcts: Vec<f64> = weights.iter().map(|w| round_to(w / total * 100.0, 1)).collect();

    let drift = 100.0 - pcts.iter().sum::<f64>();
    if let Some(max) = pcts.iter_mut().max_by(|a, b| a.total_cmp(b)) {
        *max = round_to(*max + drift, 1);
    }
    pcts
}

fn weighted_index(rng: &mut StdRng, weights: &[f64]) -> usize {
    let total: f64 = weights.iter().sum();
    let mut pick = rng.random_range(0.0..total);
    for (i, w) in weights.iter().enumerate() {
        if pick < *w {
            return i;
        }
        pick -= w;
    }
    weights.len() - 1
}

fn generate_prizes(
    rng: &mut StdRng,
    product: Product,
    prize_pool: u64,
    correct: u32,
    rows: u64,
    target_payout: Option<u64>,
) -> BTreeMap<String, Prize> {
    let mut prizes = BTreeMap::new();

    for (idx, (&tier, &share)) in product
        .prize_tiers()
        .iter()
        .zip(product.tier_shares())
        .enumerate()
    {
        let Some(key) = tier_key(tier) else { continue };
        let tier_pool = prize_pool * u64::from(share) / 100;

        let prize = match target_payout {
            Some(target) if tier == correct => {
                // Closest whole-kroner amount per row to the target.
                let amount = (target.saturating_add(rows / 2) / rows).max(1);
                Prize {
                    winners: ((tier_pool + amount / 2) / amount).max(1),
                    amount,
                }
            }
            _ => {
                let winners = match idx {
                    0 => rng.random_range(1..=25u64),
                    1 => rng.random_range(50..=400u64),
                    _ => rng.random_range(500..=4_000u64),
                };
                Prize {
                    winners,
                    amount: (tier_pool / winners).max(1),
                }
            }
        };
        prizes.insert(key.to_string(), prize);
    }

    prizes
}

fn compute_statistics(races: &[RaceResult], rows: u64, total_cost: Decimal) -> Statistics {
    let average_winner_odds = if races.is_empty() {
        0.0
    } else {
        round_to(races.iter().map(|r| r.winner_odds).sum::<f64>() / races.len() as f64, 2)
    };
    let combinations: f64 = races.iter().map(|r| f64::from(r.total_starters)).product();

    Statistics {
        average_winner_odds,
        favorite_wins: races.iter().filter(|r| r.winner <= 3).count() as u32,
        coverage_percentage: round_to(rows as f64 / combinations * 100.0, 4),
        average_bet_size: total_cost,
    }
}
