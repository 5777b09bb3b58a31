//! Coupon (bong) data model.
//!
//! Field names are camelCase on the wire; this is the shape the console
//! pastes into prompts and the analyzer reads back.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Pool game the coupon is played on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Product {
    V75,
    V64,
    V65,
}

impl Product {
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::V75 => "V75",
            Product::V64 => "V64",
            Product::V65 => "V65",
        }
    }

    pub fn races(&self) -> u32 {
        match self {
            Product::V75 => 7,
            Product::V64 | Product::V65 => 6,
        }
    }

    /// Correct-race counts that pay out, highest first.
    pub fn prize_tiers(&self) -> &'static [u32] {
        match self {
            Product::V75 => &[7, 6, 5],
            Product::V64 => &[6, 5, 4],
            Product::V65 => &[6, 5],
        }
    }

    /// Share of the prize pool per tier, in percent, aligned with `prize_tiers`.
    pub fn tier_shares(&self) -> &'static [u32] {
        match self.prize_tiers().len() {
            3 => &[50, 30, 20],
            _ => &[60, 40],
        }
    }

    pub fn lowest_tier(&self) -> u32 {
        self.prize_tiers().iter().copied().min().unwrap_or(0)
    }

    pub fn price_per_row(&self) -> Decimal {
        match self {
            Product::V75 => dec!(0.50),
            Product::V64 | Product::V65 => dec!(1),
        }
    }

    pub fn start_time(&self) -> &'static str {
        match self {
            Product::V75 => "16:15",
            Product::V64 => "18:45",
            Product::V65 => "12:45",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Product {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "V75" => Ok(Product::V75),
            "V64" => Ok(Product::V64),
            "V65" => Ok(Product::V65),
            other => Err(format!("Unknown product: {other}")),
        }
    }
}

impl Default for Product {
    fn default() -> Self {
        Product::V75
    }
}

/// Key of a prize tier in the `prizes` map, e.g. `sevenCorrect`.
pub fn tier_key(correct: u32) -> Option<&'static str> {
    match correct {
        8 => Some("eightCorrect"),
        7 => Some("sevenCorrect"),
        6 => Some("sixCorrect"),
        5 => Some("fiveCorrect"),
        4 => Some("fourCorrect"),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub product: Product,
    pub track: String,
    pub date: chrono::NaiveDate,
    pub start_time: String,
    pub bet_details: BetDetails,
    pub pool_info: PoolInfo,
    /// Race number ("1".."n") to marked horse numbers.
    pub markings: BTreeMap<String, Vec<u32>>,
    pub race_results: Vec<RaceResult>,
    pub result: CouponResult,
    pub prizes: BTreeMap<String, Prize>,
    pub statistics: Statistics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BetDetails {
    pub rows: u64,
    pub price_per_row: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    pub total_pool: u64,
    pub prize_pool: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RaceResult {
    pub race: u32,
    pub total_starters: u32,
    pub pool_size: u64,
    pub winner: u32,
    pub winner_name: String,
    pub winner_odds: f64,
    pub hit: bool,
    pub results: Vec<HorseResult>,
    pub betting_distribution: BettingDistribution,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HorseResult {
    pub position: u32,
    pub horse: u32,
    pub name: String,
    pub odds: f64,
    pub percentage_bet: f64,
    pub amount_bet: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BettingDistribution {
    pub favorite: Choice,
    pub second_choice: Choice,
    pub third_choice: Choice,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub horse: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CouponResult {
    pub correct_races: u32,
    pub total_races: u32,
    pub payout: u64,
    pub won: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prize {
    pub winners: u64,
    /// Kroner per winning row.
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub average_winner_odds: f64,
    pub favorite_wins: u32,
    pub coverage_percentage: f64,
    pub average_bet_size: Decimal,
}
