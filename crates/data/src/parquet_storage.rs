//! Parquet persistence for every columnar pipeline artifact.
//!
//! Timestamp columns carry an explicit timezone contract:
//! - market bars, posts and the master table are timezone-aware (`UTC`)
//! - the sentiment file is timezone-naive (UTC wall-clock, no annotation)
//!
//! Readers check the annotation and refuse files that break the contract.

use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, Float64Array, Int64Array, ListArray, ListBuilder, StringArray,
    StringBuilder, TimestampMillisecondArray, UInt64Array,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use crate::models::{
    column_name, MasterRow, MasterTable, OhlcvBar, PricePoint, RawPost, ScoredPost,
    SentimentAggregate, SentimentRecord, POST_COUNT_SUFFIX, PRICE_FIELDS,
    SENTIMENT_MEAN_SUFFIX,
};

const UTC_TZ: &str = "UTC";

pub struct ParquetStorage;

impl ParquetStorage {
    /// Writes OHLCV bars with a timezone-aware `timestamp` column.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write_bars(path: &Path, bars: &[OhlcvBar]) -> Result<()> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("timestamp", utc_timestamp_type(), false),
            Field::new("open", DataType::Float64, false),
            Field::new("high", DataType::Float64, false),
            Field::new("low", DataType::Float64, false),
            Field::new("close", DataType::Float64, false),
            Field::new("volume", DataType::Float64, false),
        ]));

        let timestamps = TimestampMillisecondArray::from(
            bars.iter()
                .map(|b| b.timestamp.timestamp_millis())
                .collect::<Vec<_>>(),
        )
        .with_timezone(UTC_TZ);

        let columns: Vec<ArrayRef> = vec![
            Arc::new(timestamps),
            Arc::new(Float64Array::from(bars.iter().map(|b| b.open).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(bars.iter().map(|b| b.high).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(bars.iter().map(|b| b.low).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(bars.iter().map(|b| b.close).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(bars.iter().map(|b| b.volume).collect::<Vec<_>>())),
        ];

        write_batch(path, schema, columns)
    }

    /// Reads OHLCV bars. The `timestamp` column must be timezone-aware; any
    /// recognised timezone is accepted and the instants are returned in UTC.
    ///
    /// # Errors
    /// Returns an error if the file is missing, malformed, or timezone-naive.
    pub fn read_bars(path: &Path) -> Result<Vec<OhlcvBar>> {
        let mut bars = Vec::new();

        for batch in read_batches(path)? {
            let timestamps = aware_timestamps(&batch, "timestamp")
                .with_context(|| format!("Invalid market file: {}", path.display()))?;
            let open = float_column(&batch, "open")?;
            let high = float_column(&batch, "high")?;
            let low = float_column(&batch, "low")?;
            let close = float_column(&batch, "close")?;
            let volume = float_column(&batch, "volume")?;

            for (i, timestamp) in timestamps.into_iter().enumerate() {
                bars.push(OhlcvBar::new(
                    timestamp,
                    open.value(i),
                    high.value(i),
                    low.value(i),
                    close.value(i),
                    volume.value(i),
                ));
            }
        }

        Ok(bars)
    }

    /// Writes raw or cleaned posts with a timezone-aware `timestamp_utc` column.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write_posts(path: &Path, posts: &[RawPost]) -> Result<()> {
        let (schema, columns) = post_columns(posts.iter(), utc_timestamp_type());
        write_batch(path, schema, columns)
    }

    /// Reads posts written by [`ParquetStorage::write_posts`].
    ///
    /// # Errors
    /// Returns an error if the file is missing, malformed, or timezone-naive.
    pub fn read_posts(path: &Path) -> Result<Vec<RawPost>> {
        let mut posts = Vec::new();

        for batch in read_batches(path)? {
            let timestamps = aware_timestamps(&batch, "timestamp_utc")
                .with_context(|| format!("Invalid post file: {}", path.display()))?;
            let ids = string_column(&batch, "id")?;
            let communities = string_column(&batch, "community")?;
            let titles = string_column(&batch, "title")?;
            let bodies = string_column(&batch, "body")?;
            let scores = int_column(&batch, "score")?;
            let comments = int_column(&batch, "comment_count")?;
            let symbols = symbol_lists(&batch)?;

            for (i, (timestamp, mentioned_symbols)) in
                timestamps.into_iter().zip(symbols).enumerate()
            {
                posts.push(RawPost {
                    id: ids.value(i).to_string(),
                    timestamp,
                    community: communities.value(i).to_string(),
                    title: titles.value(i).to_string(),
                    body: (!bodies.is_null(i)).then(|| bodies.value(i).to_string()),
                    score: scores.value(i),
                    comment_count: comments.value(i),
                    mentioned_symbols,
                });
            }
        }

        Ok(posts)
    }

    /// Writes scored posts. The `timestamp_utc` column is written
    /// timezone-naive (UTC wall-clock) and must be localized by readers.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write_scored_posts(path: &Path, scored: &[ScoredPost]) -> Result<()> {
        let naive_type = DataType::Timestamp(TimeUnit::Millisecond, None);
        let (base_schema, mut columns) = post_columns(scored.iter().map(|s| &s.post), naive_type);

        let mut fields: Vec<Field> = base_schema
            .fields()
            .iter()
            .map(|f| f.as_ref().clone())
            .collect();
        fields.push(Field::new("sentiment_score", DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from(
            scored.iter().map(|s| s.sentiment_score).collect::<Vec<_>>(),
        )));

        write_batch(path, Arc::new(Schema::new(fields)), columns)
    }

    /// Reads the sentiment view of scored posts. The timestamp column must be
    /// timezone-naive.
    ///
    /// # Errors
    /// Returns an error if the file is missing, malformed, or carries a timezone.
    pub fn read_sentiment(path: &Path) -> Result<Vec<SentimentRecord>> {
        let mut records = Vec::new();

        for batch in read_batches(path)? {
            let timestamps = naive_timestamps(&batch, "timestamp_utc")
                .with_context(|| format!("Invalid sentiment file: {}", path.display()))?;
            let ids = string_column(&batch, "id")?;
            let scores = float_column(&batch, "sentiment_score")?;
            let symbols = symbol_lists(&batch)?;

            for (i, (timestamp, mentioned_symbols)) in
                timestamps.into_iter().zip(symbols).enumerate()
            {
                records.push(SentimentRecord {
                    id: ids.value(i).to_string(),
                    timestamp,
                    mentioned_symbols,
                    sentiment_score: scores.value(i),
                });
            }
        }

        Ok(records)
    }

    /// Writes the master hourly table.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write_master(path: &Path, table: &MasterTable) -> Result<()> {
        let rows = table.rows();
        let mut fields = vec![Field::new("timestamp", utc_timestamp_type(), false)];
        let mut columns: Vec<ArrayRef> = vec![Arc::new(
            TimestampMillisecondArray::from(
                rows.iter()
                    .map(|r| r.timestamp.timestamp_millis())
                    .collect::<Vec<_>>(),
            )
            .with_timezone(UTC_TZ),
        )];

        for (idx, symbol) in table.symbols().iter().enumerate() {
            for field in PRICE_FIELDS {
                fields.push(Field::new(column_name(symbol, field), DataType::Float64, true));
                let values: Vec<Option<f64>> = rows
                    .iter()
                    .map(|r| r.prices[idx].map(|p| price_field(&p, field)))
                    .collect();
                columns.push(Arc::new(Float64Array::from(values)));
            }
        }

        for (idx, symbol) in table.symbols().iter().enumerate() {
            fields.push(Field::new(
                column_name(symbol, SENTIMENT_MEAN_SUFFIX),
                DataType::Float64,
                false,
            ));
            columns.push(Arc::new(Float64Array::from(
                rows.iter()
                    .map(|r| r.sentiment[idx].mean_sentiment)
                    .collect::<Vec<_>>(),
            )));

            fields.push(Field::new(
                column_name(symbol, POST_COUNT_SUFFIX),
                DataType::UInt64,
                false,
            ));
            columns.push(Arc::new(UInt64Array::from(
                rows.iter()
                    .map(|r| r.sentiment[idx].post_count)
                    .collect::<Vec<_>>(),
            )));
        }

        write_batch(path, Arc::new(Schema::new(fields)), columns)
    }

    /// Reads a master table. Symbols are recovered from the `{sym}_close`
    /// columns, in file order, and returned upper-cased.
    ///
    /// # Errors
    /// Returns an error if the file is missing or any expected column is absent.
    pub fn read_master(path: &Path) -> Result<MasterTable> {
        let batches = read_batches(path)?;
        let Some(first) = batches.first() else {
            return Ok(MasterTable::new(Vec::new(), Vec::new()));
        };

        let symbols: Vec<String> = first
            .schema()
            .fields()
            .iter()
            .filter_map(|f| f.name().strip_suffix("_close").map(str::to_uppercase))
            .collect();

        let mut rows = Vec::new();
        for batch in &batches {
            let timestamps = aware_timestamps(batch, "timestamp")
                .with_context(|| format!("Invalid master file: {}", path.display()))?;

            let mut price_cols = Vec::with_capacity(symbols.len());
            let mut sentiment_cols = Vec::with_capacity(symbols.len());
            for symbol in &symbols {
                let mut fields = Vec::with_capacity(PRICE_FIELDS.len());
                for field in PRICE_FIELDS {
                    fields.push(float_column(batch, &column_name(symbol, field))?);
                }
                price_cols.push(fields);
                sentiment_cols.push((
                    float_column(batch, &column_name(symbol, SENTIMENT_MEAN_SUFFIX))?,
                    uint_column(batch, &column_name(symbol, POST_COUNT_SUFFIX))?,
                ));
            }

            for (i, timestamp) in timestamps.into_iter().enumerate() {
                let prices = price_cols
                    .iter()
                    .map(|cols| {
                        if cols.iter().any(|c| c.is_null(i)) {
                            None
                        } else {
                            Some(PricePoint {
                                open: cols[0].value(i),
                                high: cols[1].value(i),
                                low: cols[2].value(i),
                                close: cols[3].value(i),
                                volume: cols[4].value(i),
                            })
                        }
                    })
                    .collect();
                let sentiment = sentiment_cols
                    .iter()
                    .map(|(mean, count)| SentimentAggregate {
                        mean_sentiment: mean.value(i),
                        post_count: count.value(i),
                    })
                    .collect();

                rows.push(MasterRow {
                    timestamp,
                    prices,
                    sentiment,
                });
            }
        }

        Ok(MasterTable::new(symbols, rows))
    }
}

fn utc_timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, Some(UTC_TZ.into()))
}

fn price_field(point: &PricePoint, field: &str) -> f64 {
    match field {
        "open" => point.open,
        "high" => point.high,
        "low" => point.low,
        "close" => point.close,
        _ => point.volume,
    }
}

fn post_columns<'a>(
    posts: impl Iterator<Item = &'a RawPost> + Clone,
    timestamp_type: DataType,
) -> (SchemaRef, Vec<ArrayRef>) {
    let tz = match &timestamp_type {
        DataType::Timestamp(_, tz) => tz.clone(),
        _ => None,
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("timestamp_utc", timestamp_type, false),
        Field::new("community", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("body", DataType::Utf8, true),
        Field::new("score", DataType::Int64, false),
        Field::new("comment_count", DataType::Int64, false),
        Field::new(
            "mentioned_symbols",
            DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
            false,
        ),
    ]));

    let millis: Vec<i64> = posts
        .clone()
        .map(|p| p.timestamp.timestamp_millis())
        .collect();
    let timestamps = match tz {
        Some(tz) => TimestampMillisecondArray::from(millis).with_timezone(tz),
        None => TimestampMillisecondArray::from(millis),
    };

    let mut symbols = ListBuilder::new(StringBuilder::new());
    for post in posts.clone() {
        for symbol in &post.mentioned_symbols {
            symbols.values().append_value(symbol);
        }
        symbols.append(true);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(
            posts.clone().map(|p| p.id.as_str()).collect::<Vec<_>>(),
        )),
        Arc::new(timestamps),
        Arc::new(StringArray::from(
            posts.clone().map(|p| p.community.as_str()).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            posts.clone().map(|p| p.title.as_str()).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            posts.clone().map(|p| p.body.as_deref()).collect::<Vec<_>>(),
        )),
        Arc::new(Int64Array::from(
            posts.clone().map(|p| p.score).collect::<Vec<_>>(),
        )),
        Arc::new(Int64Array::from(
            posts.map(|p| p.comment_count).collect::<Vec<_>>(),
        )),
        Arc::new(symbols.finish()),
    ];

    (schema, columns)
}

fn write_batch(path: &Path, schema: SchemaRef, columns: Vec<ArrayRef>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create Parquet file: {}", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;

    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

fn read_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open Parquet file: {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(batches)
}

fn typed_column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("Missing column '{name}'"))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow!("Column '{name}' has an unexpected type"))
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    typed_column(batch, name)
}

fn int_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    typed_column(batch, name)
}

fn uint_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt64Array> {
    typed_column(batch, name)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    typed_column(batch, name)
}

fn symbol_lists(batch: &RecordBatch) -> Result<Vec<Vec<String>>> {
    let lists: &ListArray = typed_column(batch, "mentioned_symbols")?;
    let mut out = Vec::with_capacity(lists.len());

    for i in 0..lists.len() {
        if lists.is_null(i) {
            out.push(Vec::new());
            continue;
        }
        let values = lists.value(i);
        let strings = values
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| anyhow!("Column 'mentioned_symbols' must be a list of strings"))?;
        out.push(
            (0..strings.len())
                .filter(|&j| !strings.is_null(j))
                .map(|j| strings.value(j).to_string())
                .collect(),
        );
    }

    Ok(out)
}

/// Returns the timestamp column cast to milliseconds, plus its timezone annotation.
fn millisecond_timestamps(
    batch: &RecordBatch,
    name: &str,
) -> Result<(TimestampMillisecondArray, Option<String>)> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("Missing column '{name}'"))?;

    let tz = match column.data_type() {
        DataType::Timestamp(_, tz) => tz.clone(),
        other => bail!("Column '{name}' is {other:?}, expected a timestamp"),
    };

    let casted = cast(column, &DataType::Timestamp(TimeUnit::Millisecond, tz.clone()))?;
    let array = casted
        .as_any()
        .downcast_ref::<TimestampMillisecondArray>()
        .ok_or_else(|| anyhow!("Column '{name}' could not be read as milliseconds"))?
        .clone();

    Ok((array, tz.map(|t| t.to_string())))
}

fn aware_timestamps(batch: &RecordBatch, name: &str) -> Result<Vec<DateTime<Utc>>> {
    let (array, tz) = millisecond_timestamps(batch, name)?;
    let tz = tz.ok_or_else(|| {
        anyhow!("Column '{name}' is timezone-naive; a timezone-aware timestamp is required")
    })?;
    ensure_known_timezone(&tz)?;

    (0..array.len())
        .map(|i| {
            if array.is_null(i) {
                bail!("Column '{name}' contains a null timestamp at row {i}");
            }
            DateTime::<Utc>::from_timestamp_millis(array.value(i))
                .ok_or_else(|| anyhow!("Timestamp out of range at row {i}"))
        })
        .collect()
}

fn naive_timestamps(batch: &RecordBatch, name: &str) -> Result<Vec<NaiveDateTime>> {
    let (array, tz) = millisecond_timestamps(batch, name)?;
    if let Some(tz) = tz {
        bail!("Column '{name}' carries timezone '{tz}'; a timezone-naive timestamp is required");
    }

    (0..array.len())
        .map(|i| {
            if array.is_null(i) {
                bail!("Column '{name}' contains a null timestamp at row {i}");
            }
            DateTime::<Utc>::from_timestamp_millis(array.value(i))
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| anyhow!("Timestamp out of range at row {i}"))
        })
        .collect()
}

/// Accepts IANA names (`UTC`, `America/New_York`) and fixed offsets (`+00:00`).
fn ensure_known_timezone(tz: &str) -> Result<()> {
    if tz.parse::<chrono_tz::Tz>().is_ok() || tz.parse::<FixedOffset>().is_ok() {
        Ok(())
    } else {
        Err(anyhow!("Unrecognised timezone annotation '{tz}'"))
    }
}
