// Route statistics over a fare snapshot history

use chrono::NaiveDate;
use std::borrow::Cow;
use std::collections::HashMap;

use crate::fare::{DestinationCount, FareRecord, RouteStatistics};

// Compute min, max, mean, population standard deviation and the cheapest
// snapshot date over a route's history.
//
// The series is expected in ascending `snapshot_date` order, which is what
// the store returns. Out-of-order input is stably sorted first, which costs
// O(n log n) on top of the O(n) aggregation. Unpriced records are ignored; if
// none remain every field is `None`.
pub fn compute_statistics(series: &[FareRecord]) -> RouteStatistics {
    let points: Vec<(NaiveDate, f64)> = ascending(series)
        .iter()
        .filter_map(|record| record.price.map(|price| (record.snapshot_date, price)))
        .collect();

    if points.is_empty() {
        return RouteStatistics::default();
    }

    let n = points.len() as f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut cheapest_date = None;

    for &(date, price) in &points {
        // Strict comparison keeps the earliest date attaining the minimum
        if price < min {
            min = price;
            cheapest_date = Some(date);
        }
        if price > max {
            max = price;
        }
        sum += price;
    }

    let mean = sum / n;
    let variance = points
        .iter()
        .map(|&(_, price)| (price - mean).powi(2))
        .sum::<f64>()
        / n;

    RouteStatistics {
        min_price: Some(min),
        max_price: Some(max),
        mean_price: Some(mean),
        std_dev_price: Some(variance.sqrt()),
        cheapest_date,
        sample_size: points.len(),
    }
}

fn ascending(series: &[FareRecord]) -> Cow<'_, [FareRecord]> {
    let sorted = series
        .windows(2)
        .all(|pair| pair[0].snapshot_date <= pair[1].snapshot_date);
    if sorted {
        Cow::Borrowed(series)
    } else {
        let mut owned = series.to_vec();
        owned.sort_by_key(|record| record.snapshot_date);
        Cow::Owned(owned)
    }
}

// Most frequently observed destinations, ties broken alphabetically
pub fn top_destinations(records: &[FareRecord], limit: usize) -> Vec<DestinationCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let code = record.destination_code.as_str();
        if code.is_empty() {
            continue;
        }
        *counts.entry(code).or_insert(0) += 1;
    }

    let mut ranked: Vec<DestinationCount> = counts
        .into_iter()
        .map(|(code, count)| DestinationCount {
            code: code.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.code.cmp(&b.code)));
    ranked.truncate(limit);
    ranked
}
