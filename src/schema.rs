use chrono::NaiveDateTime;
use diesel::prelude::*;

diesel::table! {
    partitions (id) {
        id -> Integer,
        name -> Text,
    }
}

diesel::table! {
    readings (id) {
        id -> Integer,
        partition_id -> Integer,
        device_id -> Text,
        turbidity -> Nullable<Double>,
        ph -> Nullable<Double>,
        temperature -> Nullable<Double>,
        dissolved_oxygen -> Nullable<Double>,
        conductivity -> Nullable<Double>,
        timestamp -> Timestamp,
        manual -> Bool,
    }
}

diesel::table! {
    feeding_events (id) {
        id -> Integer,
        device_id -> Text,
        event_type -> Text,
        timestamp -> Timestamp,
    }
}

diesel::joinable!(readings -> partitions (partition_id));
diesel::allow_tables_to_appear_in_same_query!(partitions, readings);

#[derive(Debug, Clone, Queryable)]
pub struct PartitionDTO {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = partitions)]
pub struct AddPartitionDTO<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Queryable)]
pub struct ReadingDTO {
    pub id: i32,
    pub partition_id: i32,
    pub device_id: String,
    pub turbidity: Option<f64>,
    pub ph: Option<f64>,
    pub temperature: Option<f64>,
    pub dissolved_oxygen: Option<f64>,
    pub conductivity: Option<f64>,
    pub timestamp: NaiveDateTime,
    pub manual: bool,
}

// Field order mirrors the stored column order: device, measurements, time, flag.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = readings)]
pub struct AddReadingDTO<'a> {
    pub partition_id: i32,
    pub device_id: &'a str,
    pub turbidity: Option<f64>,
    pub ph: Option<f64>,
    pub temperature: Option<f64>,
    pub dissolved_oxygen: Option<f64>,
    pub conductivity: Option<f64>,
    pub timestamp: NaiveDateTime,
    pub manual: bool,
}

#[derive(Debug, Clone, Queryable)]
pub struct FeedingEventDTO {
    pub id: i32,
    pub device_id: String,
    pub event_type: String,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = feeding_events)]
pub struct AddFeedingEventDTO<'a> {
    pub device_id: &'a str,
    pub event_type: &'a str,
    pub timestamp: NaiveDateTime,
}
