//! Football schedule scheduler: keeps `game` rows in line with the
//! published season schedule and streams live scores into Postgres.

pub mod active;
pub mod config;
pub mod feed;
pub mod monitor;
pub mod scheduler;
pub mod sync;
pub mod updater;
