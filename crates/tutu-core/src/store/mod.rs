//! SQLite-backed persistence for work items and their steps.

pub mod db;
mod items;
mod steps;

pub use db::Store;
