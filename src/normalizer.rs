// Snapshot normalization: flattens provider records into storable fare rows

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use crate::fare::{FareRecord, Mode};
use crate::provider::{FlightOffer, ProviderRecord, TrainService};

#[derive(Error, Debug, PartialEq)]
pub enum NormalizeError {
    #[error("Missing query context: {0}")]
    MissingQueryContext(&'static str),
}

// Route and date every normalized record is stamped with
#[derive(Debug, Clone, Default)]
pub struct SnapshotContext {
    pub origin_code: String,
    pub destination_code: String,
    pub snapshot_date: Option<NaiveDate>,
}

impl SnapshotContext {
    pub fn new(
        origin_code: impl Into<String>,
        destination_code: impl Into<String>,
        snapshot_date: NaiveDate,
    ) -> Self {
        Self {
            origin_code: origin_code.into(),
            destination_code: destination_code.into(),
            snapshot_date: Some(snapshot_date),
        }
    }
}

struct ResolvedContext {
    origin_code: String,
    destination_code: String,
    snapshot_date: NaiveDate,
}

fn resolve(context: &SnapshotContext) -> Result<ResolvedContext, NormalizeError> {
    let origin_code = context.origin_code.trim();
    if origin_code.is_empty() {
        return Err(NormalizeError::MissingQueryContext("origin_code"));
    }
    let destination_code = context.destination_code.trim();
    if destination_code.is_empty() {
        return Err(NormalizeError::MissingQueryContext("destination_code"));
    }
    let snapshot_date = context
        .snapshot_date
        .ok_or(NormalizeError::MissingQueryContext("snapshot_date"))?;

    Ok(ResolvedContext {
        origin_code: origin_code.to_ascii_uppercase(),
        destination_code: destination_code.to_ascii_uppercase(),
        snapshot_date,
    })
}

// Flatten provider records into one `FareRecord` per priced service tier.
//
// Flights map one-to-one. A train fans out into one record per fare class and
// a train without classes produces nothing. Fails without producing records
// when the context is missing its route or date.
pub fn normalize(
    raw_records: &[ProviderRecord],
    context: &SnapshotContext,
) -> Result<Vec<FareRecord>, NormalizeError> {
    let context = resolve(context)?;

    let mut records = Vec::with_capacity(raw_records.len());
    for raw in raw_records {
        match raw {
            ProviderRecord::Flight(offer) => records.push(flight_record(offer, &context)),
            ProviderRecord::Train(train) => {
                if train.classes.is_empty() {
                    debug!(
                        "Skipping train {:?} with no fare classes",
                        train.train_number.as_ref().or(train.train_name.as_ref())
                    );
                }
                records.extend(train_records(train, &context));
            }
        }
    }

    Ok(records)
}

fn base_record(mode: Mode, context: &ResolvedContext, price: Option<f64>) -> FareRecord {
    FareRecord::new(
        mode,
        context.origin_code.clone(),
        context.destination_code.clone(),
        context.snapshot_date,
        sanitize_price(price),
    )
}

fn flight_record(offer: &FlightOffer, context: &ResolvedContext) -> FareRecord {
    let mut record = base_record(Mode::Flight, context, offer.price);
    record.carrier_or_train_identifier = non_blank(&offer.flight_number)
        .or_else(|| non_blank(&offer.airline));
    record.fare_class = non_blank(&offer.cabin);
    record.departure = non_blank(&offer.departure);
    record.arrival = non_blank(&offer.arrival);
    record.availability = non_blank(&offer.status);
    record
}

fn train_records<'a>(
    train: &'a TrainService,
    context: &'a ResolvedContext,
) -> impl Iterator<Item = FareRecord> + 'a {
    let identifier =
        non_blank(&train.train_number).or_else(|| non_blank(&train.train_name));
    let departure = non_blank(&train.departure);
    let arrival = non_blank(&train.arrival);

    train.classes.iter().map(move |class| {
        let mut record = base_record(Mode::Train, context, class.fare);
        record.carrier_or_train_identifier = identifier.clone();
        record.departure = departure.clone();
        record.arrival = arrival.clone();
        record.fare_class = Some(class.class_code.trim().to_string()).filter(|c| !c.is_empty());
        record.availability = non_blank(&class.availability);
        record
    })
}

fn sanitize_price(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p >= 0.0)
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
