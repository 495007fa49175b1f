/// CSV exporters for the report tables.
pub mod export;
