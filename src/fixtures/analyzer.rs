//! Consistency analysis for coupon JSON.
//!
//! Works on raw `serde_json::Value` so that hand-edited or partially
//! broken coupons can still be inspected. Findings are split into
//! errors (the coupon contradicts itself), warnings (unusual but
//! possible) and informational notes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::model::{tier_key, Product};

const REQUIRED_FIELDS: [&str; 10] = [
    "product",
    "track",
    "date",
    "startTime",
    "betDetails",
    "poolInfo",
    "markings",
    "raceResults",
    "result",
    "prizes",
];

/// Expected share of the total pool paid out as prizes.
const PRIZE_POOL_RATIO: f64 = 0.65;
/// Upper bound on `totalStarters` accepted for the position check.
const MAX_STARTERS_PER_RACE: i64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Fail,
    Pass,
    Excellent,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Fail => "FAIL",
            OverallStatus::Pass => "PASS",
            OverallStatus::Excellent => "EXCELLENT",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_errors: usize,
    pub total_warnings: usize,
    pub total_info: usize,
    pub overall_status: OverallStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: AnalysisSummary,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl AnalysisReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ---- Value helpers ----

fn num(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn int(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(Value::as_i64)
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn object<'a>(value: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    value.get(key).and_then(Value::as_object)
}

/// Marked horse numbers for a race, empty when missing.
fn marked(markings: Option<&Map<String, Value>>, race: usize) -> Vec<i64> {
    markings
        .and_then(|m| m.get(&race.to_string()))
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default()
}

fn fmt_list<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    let parts: Vec<String> = items.into_iter().map(|i| i.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// Collects findings for one coupon.
#[derive(Debug, Default)]
pub struct CouponAnalyzer {
    errors: Vec<String>,
    warnings: Vec<String>,
    info: Vec<String>,
}

impl CouponAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(mut self, data: &Value) -> AnalysisReport {
        let product = data
            .get("product")
            .and_then(Value::as_str)
            .and_then(|p| p.parse::<Product>().ok());

        self.validate_structure(data, product);
        self.check_pool_math(data);
        self.validate_markings(data, product);
        self.validate_prizes(data, product);
        self.check_result_integrity(data);
        self.analyze_betting_patterns(data);
        self.validate_hits(data);
        self.check_statistics(data);

        let overall_status = if !self.errors.is_empty() {
            OverallStatus::Fail
        } else if !self.warnings.is_empty() {
            OverallStatus::Pass
        } else {
            OverallStatus::Excellent
        };

        AnalysisReport {
            summary: AnalysisSummary {
                total_errors: self.errors.len(),
                total_warnings: self.warnings.len(),
                total_info: self.info.len(),
                overall_status,
            },
            errors: self.errors,
            warnings: self.warnings,
            info: self.info,
        }
    }

    fn expected_races(data: &Value, product: Option<Product>) -> usize {
        product
            .map(|p| p.races() as usize)
            .unwrap_or_else(|| array(data, "raceResults").len())
    }

    // ---- Structure ----

    fn validate_structure(&mut self, data: &Value, product: Option<Product>) {
        for field in REQUIRED_FIELDS {
            if data.get(field).is_none() {
                self.errors.push(format!("Missing required field: {field}"));
            }
        }

        let Some(product) = product else {
            if let Some(name) = data.get("product").and_then(Value::as_str) {
                self.warnings
                    .push(format!("Unknown product {name}, race count not checked"));
            }
            return;
        };

        let races = product.races() as usize;
        let found = array(data, "raceResults").len();
        if found != races {
            self.errors
                .push(format!("{product} must have exactly {races} races, found {found}"));
        }

        let total_races = data.get("result").and_then(|r| int(r, "totalRaces"));
        if total_races != Some(races as i64) {
            let shown = total_races.map_or("none".to_string(), |t| t.to_string());
            self.errors.push(format!(
                "Result totalRaces should be {races} for {product}, found {shown}"
            ));
        }

        self.info.push(format!(
            "{product}: {races} races, prize tiers {}",
            fmt_list(product.prize_tiers())
        ));
    }

    // ---- Pools and betting math ----

    fn check_pool_math(&mut self, data: &Value) {
        let total_pool = data.get("poolInfo").map_or(0.0, |p| num(p, "totalPool"));
        if total_pool <= 0.0 {
            self.errors.push("Total pool must be positive".to_string());
            return;
        }

        let races = array(data, "raceResults");
        let race_pool_sum: f64 = races.iter().map(|r| num(r, "poolSize")).sum();
        if race_pool_sum > total_pool {
            self.errors.push(format!(
                "Sum of race pools ({race_pool_sum}) exceeds total pool ({total_pool})"
            ));
        } else if race_pool_sum < total_pool * 0.3 {
            self.warnings.push(format!(
                "Sum of race pools ({race_pool_sum}) seems very low compared to total pool ({total_pool})"
            ));
        }

        for (idx, race) in races.iter().enumerate() {
            self.check_race_betting(race, idx + 1);
        }
    }

    fn check_race_betting(&mut self, race: &Value, race_no: usize) {
        let horses = array(race, "results");
        let pool_size = num(race, "poolSize");
        if horses.is_empty() || pool_size <= 0.0 {
            return;
        }

        let total_bet: f64 = horses.iter().map(|h| num(h, "amountBet")).sum();
        let total_pct: f64 = horses.iter().map(|h| num(h, "percentageBet")).sum();

        if (total_bet - pool_size).abs() > pool_size * 0.1 {
            self.warnings.push(format!(
                "Race {race_no}: Total amount bet ({total_bet}) doesn't match pool size ({pool_size})"
            ));
        }
        if (total_pct - 100.0).abs() > 10.0 {
            self.errors.push(format!(
                "Race {race_no}: Betting percentages sum to {total_pct:.1}%, should be close to 100%"
            ));
        }

        for horse in horses {
            let pct = num(horse, "percentageBet");
            let odds = num(horse, "odds");
            if pct > 0.0 && odds > 0.0 {
                let implied = 100.0 / odds;
                if (implied - pct).abs() > pct * 0.5 {
                    self.warnings.push(format!(
                        "Race {race_no}, Horse {}: Odds {odds} imply {implied:.1}% but betting is {pct:.1}%",
                        horse.get("horse").unwrap_or(&Value::Null)
                    ));
                }
            }
        }
    }

    // ---- Markings ----

    fn validate_markings(&mut self, data: &Value, product: Option<Product>) {
        let races = Self::expected_races(data, product);
        let markings = object(data, "markings");
        let count = markings.map_or(0, Map::len);
        if count != races {
            self.errors
                .push(format!("Coupon should have markings for {races} races, found {count}"));
        }

        let expected: BTreeSet<String> = (1..=races).map(|i| i.to_string()).collect();
        let actual: BTreeSet<String> = markings
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        let missing: Vec<&String> = expected.difference(&actual).collect();
        let extra: Vec<&String> = actual.difference(&expected).collect();
        if !missing.is_empty() {
            self.errors
                .push(format!("Missing markings for races: {}", fmt_list(missing)));
        }
        if !extra.is_empty() {
            self.errors
                .push(format!("Unexpected marking keys: {}", fmt_list(extra)));
        }

        for (idx, race) in array(data, "raceResults").iter().enumerate() {
            let race_no = idx + 1;
            let starters: BTreeSet<i64> = array(race, "results")
                .iter()
                .filter_map(|h| int(h, "horse"))
                .collect();
            for horse in marked(markings, race_no) {
                if !starters.contains(&horse) {
                    self.errors
                        .push(format!("Race {race_no}: Marked horse {horse} not found in results"));
                }
            }
        }
    }

    // ---- Prizes and payout ----

    fn validate_prizes(&mut self, data: &Value, product: Option<Product>) {
        let total_pool = data.get("poolInfo").map_or(0.0, |p| num(p, "totalPool"));
        let expected_prize_pool = total_pool * PRIZE_POOL_RATIO;
        let prizes = object(data, "prizes");

        let tier_total = |key: &str| -> Option<f64> {
            prizes
                .and_then(|p| p.get(key))
                .map(|prize| num(prize, "winners") * num(prize, "amount"))
        };

        let distributed: f64 = prizes
            .map(|p| p.values().map(|v| num(v, "winners") * num(v, "amount")).sum())
            .unwrap_or(0.0);
        if distributed > expected_prize_pool * 1.1 {
            self.warnings.push(format!(
                "Total prize distribution ({distributed}) exceeds expected prize pool ({expected_prize_pool:.0})"
            ));
        } else if distributed < expected_prize_pool * 0.5 {
            self.warnings.push(format!(
                "Total prize distribution ({distributed}) seems very low compared to prize pool ({expected_prize_pool:.0})"
            ));
        }

        if let Some(product) = product {
            let tiers = product.prize_tiers();
            let totals: Option<Vec<f64>> = tiers
                .iter()
                .map(|&t| tier_key(t).and_then(tier_total))
                .collect();
            if let Some(totals) = totals {
                let sum: f64 = totals.iter().sum();
                if sum > 0.0 {
                    for (i, ((&tier, &share), total)) in
                        tiers.iter().zip(product.tier_shares()).zip(&totals).enumerate()
                    {
                        let pct = total / sum * 100.0;
                        let tolerance = if i == 0 { 20.0 } else { 15.0 };
                        if (pct - f64::from(share)).abs() > tolerance {
                            self.warnings.push(format!(
                                "{tier}-correct prize share is {pct:.1}%, expected ~{share}%"
                            ));
                        }
                    }
                }
            }
        }

        let result = data.get("result").unwrap_or(&Value::Null);
        let correct = int(result, "correctRaces").unwrap_or(0);
        let payout = num(result, "payout");
        let rows = data
            .get("betDetails")
            .and_then(|b| b.get("rows"))
            .and_then(Value::as_f64)
            .unwrap_or(1.0);

        let lowest = product.map_or(i64::MAX, |p| i64::from(p.lowest_tier()));
        if correct >= lowest {
            let expected = u32::try_from(correct)
                .ok()
                .and_then(tier_key)
                .and_then(|key| prizes.and_then(|p| p.get(key)))
                .map_or(0.0, |prize| num(prize, "amount") * rows);
            if (expected - payout).abs() > 0.01 {
                self.errors.push(format!(
                    "Payout calculation error: Expected {expected}, got {payout} for {correct} correct races with {rows} rows"
                ));
            }
        } else if payout > 0.0 && product.is_some() {
            self.errors.push(format!(
                "Payout {payout} recorded for {correct} correct races, below the lowest prize tier"
            ));
        }

        if let Some(won) = result.get("won").and_then(Value::as_bool) {
            if won != (payout > 0.0) {
                self.errors
                    .push(format!("Result won={won} contradicts payout {payout}"));
            }
        }
    }

    // ---- Result integrity ----

    fn check_result_integrity(&mut self, data: &Value) {
        for (idx, race) in array(data, "raceResults").iter().enumerate() {
            let race_no = idx + 1;
            let horses = array(race, "results");
            let starters = int(race, "totalStarters").unwrap_or(0);

            if horses.len() as i64 != starters {
                self.errors.push(format!(
                    "Race {race_no}: {} results but totalStarters is {starters}",
                    horses.len()
                ));
            }

            let positions: Vec<i64> = horses.iter().filter_map(|h| int(h, "position")).collect();
            let distinct: BTreeSet<i64> = positions.iter().copied().collect();
            if !(0..=MAX_STARTERS_PER_RACE).contains(&starters) {
                self.errors.push(format!(
                    "Race {race_no}: totalStarters {starters} outside 0..={MAX_STARTERS_PER_RACE}"
                ));
            } else {
                let expected: BTreeSet<i64> = (1..=starters).collect();
                if distinct != expected {
                    let missing: Vec<&i64> = expected.difference(&distinct).collect();
                    let duplicates = positions.len() - distinct.len();
                    if !missing.is_empty() {
                        self.errors
                            .push(format!("Race {race_no}: Missing positions {}", fmt_list(missing)));
                    }
                    if duplicates > 0 {
                        self.errors
                            .push(format!("Race {race_no}: {duplicates} duplicate positions found"));
                    }
                }
            }

            let numbers: Vec<i64> = horses.iter().filter_map(|h| int(h, "horse")).collect();
            let unique: BTreeSet<&i64> = numbers.iter().collect();
            if unique.len() != numbers.len() {
                self.errors
                    .push(format!("Race {race_no}: Duplicate horse numbers found"));
            }

            let Some(first) = horses.iter().find(|h| int(h, "position") == Some(1)) else {
                continue;
            };
            let winner = int(race, "winner");
            if int(first, "horse") != winner {
                self.errors.push(format!(
                    "Race {race_no}: Winner field ({}) doesn't match position 1 horse ({})",
                    race.get("winner").unwrap_or(&Value::Null),
                    first.get("horse").unwrap_or(&Value::Null)
                ));
            }
            if first.get("name") != race.get("winnerName") {
                self.errors.push(format!("Race {race_no}: Winner name mismatch"));
            }
            if (num(first, "odds") - num(race, "winnerOdds")).abs() > 0.1 {
                self.errors.push(format!("Race {race_no}: Winner odds mismatch"));
            }
        }
    }

    // ---- Betting patterns ----

    fn analyze_betting_patterns(&mut self, data: &Value) {
        for (idx, race) in array(data, "raceResults").iter().enumerate() {
            let race_no = idx + 1;
            let horses = array(race, "results");

            if let Some(dist) = race.get("bettingDistribution").filter(|d| d.is_object()) {
                let choices = ["favorite", "secondChoice", "thirdChoice"]
                    .map(|name| (name, dist.get(name).unwrap_or(&Value::Null)));

                if num(choices[0].1, "percentage") <= num(choices[1].1, "percentage") {
                    self.warnings
                        .push(format!("Race {race_no}: Favorite percentage not highest"));
                }

                for (name, choice) in choices {
                    if let Some(horse) = int(choice, "horse").filter(|h| *h != 0) {
                        if !horses.iter().any(|h| int(h, "horse") == Some(horse)) {
                            self.errors.push(format!(
                                "Race {race_no}: {name} horse {horse} not found in results"
                            ));
                        }
                    }
                }
            }

            let odds: Vec<f64> = horses
                .iter()
                .map(|h| num(h, "odds"))
                .filter(|o| *o > 0.0)
                .collect();
            if let (Some(min), Some(max)) = (
                odds.iter().copied().reduce(f64::min),
                odds.iter().copied().reduce(f64::max),
            ) {
                if min < 1.1 {
                    self.warnings
                        .push(format!("Race {race_no}: Very low minimum odds ({min})"));
                }
                if max > 500.0 {
                    self.warnings
                        .push(format!("Race {race_no}: Very high maximum odds ({max})"));
                }
            }
        }
    }

    // ---- Hits ----

    fn validate_hits(&mut self, data: &Value) {
        let markings = object(data, "markings");
        let mut calculated = 0i64;

        for (idx, race) in array(data, "raceResults").iter().enumerate() {
            let race_no = idx + 1;
            let marks = marked(markings, race_no);
            let winner = int(race, "winner");
            let hit = race.get("hit").and_then(Value::as_bool).unwrap_or(false);
            let should_hit = winner.is_some_and(|w| marks.contains(&w));

            if hit != should_hit {
                let label = |h: bool| if h { "hit" } else { "miss" };
                self.errors.push(format!(
                    "Race {race_no}: Hit calculation wrong. Winner {}, marked {}, recorded as {}, should be {}",
                    race.get("winner").unwrap_or(&Value::Null),
                    fmt_list(&marks),
                    label(hit),
                    label(should_hit)
                ));
            }
            if should_hit {
                calculated += 1;
            }
        }

        let recorded = data
            .get("result")
            .and_then(|r| int(r, "correctRaces"))
            .unwrap_or(0);
        if calculated != recorded {
            self.errors.push(format!(
                "Correct races mismatch: Calculated {calculated}, recorded {recorded}"
            ));
        } else {
            self.info.push(format!("Coupon hit {calculated} races"));
        }
    }

    // ---- Statistics ----

    fn check_statistics(&mut self, data: &Value) {
        let Some(stats) = data.get("statistics").filter(|s| s.is_object()) else {
            self.warnings.push("No statistics section found".to_string());
            return;
        };
        let races = array(data, "raceResults");

        let winner_odds: Vec<f64> = races
            .iter()
            .map(|r| num(r, "winnerOdds"))
            .filter(|o| *o != 0.0)
            .collect();
        if !winner_odds.is_empty() {
            let calculated = winner_odds.iter().sum::<f64>() / winner_odds.len() as f64;
            let recorded = num(stats, "averageWinnerOdds");
            if (calculated - recorded).abs() > 0.1 {
                self.errors.push(format!(
                    "Average winner odds calculation wrong: Calculated {calculated:.2}, recorded {recorded}"
                ));
            }
        }

        // Start numbers 1-3 count as favourites.
        let fav_wins = races
            .iter()
            .filter_map(|r| int(r, "winner"))
            .filter(|w| (1..=3).contains(w))
            .count() as i64;
        let recorded_fav = int(stats, "favoriteWins").unwrap_or(0);
        if fav_wins != recorded_fav {
            self.errors.push(format!(
                "Favorite wins calculation wrong: Calculated {fav_wins}, recorded {recorded_fav}"
            ));
        }

        let coverage = num(stats, "coveragePercentage");
        if !(0.1..=10.0).contains(&coverage) {
            self.warnings
                .push(format!("Coverage percentage {coverage}% seems unrealistic"));
        }

        let bet_size = num(stats, "averageBetSize");
        if !(10.0..=10_000.0).contains(&bet_size) {
            self.warnings
                .push(format!("Average bet size {bet_size} kr seems unrealistic"));
        }
    }
}

/// Run every check on `data`.
pub fn analyze(data: &Value) -> AnalysisReport {
    CouponAnalyzer::new().analyze(data)
}

/// Human-readable report, optionally headed with the file it came from.
pub fn render_report(report: &AnalysisReport, filename: Option<&str>) -> String {
    let rule = "=".repeat(80);
    let sub = "-".repeat(40);
    let mut out = vec![
        rule.clone(),
        "COUPON CONSISTENCY ANALYSIS REPORT".to_string(),
        rule.clone(),
    ];

    if let Some(name) = filename {
        out.push(format!("File: {name}"));
        out.push(String::new());
    }

    let s = &report.summary;
    out.push(format!("OVERALL STATUS: {}", s.overall_status.as_str()));
    out.push(format!("Total Errors: {}", s.total_errors));
    out.push(format!("Total Warnings: {}", s.total_warnings));
    out.push(format!("Total Info Items: {}", s.total_info));
    out.push(String::new());

    for (title, items) in [
        ("CRITICAL ERRORS:", &report.errors),
        ("WARNINGS:", &report.warnings),
        ("INFORMATIONAL:", &report.info),
    ] {
        if items.is_empty() {
            continue;
        }
        out.push(title.to_string());
        out.push(sub.clone());
        for (i, item) in items.iter().enumerate() {
            out.push(format!("{:2}. {item}", i + 1));
        }
        out.push(String::new());
    }

    match (report.errors.is_empty(), report.warnings.is_empty()) {
        (true, true) => out.push("ALL CHECKS PASSED: data is mathematically consistent.".to_string()),
        (true, false) => out.push("No critical errors found, but some warnings noted above.".to_string()),
        (false, _) => out.push("Critical errors found that need attention.".to_string()),
    }
    out.push(rule);

    out.join("\n")
}
