pub mod column_stats;
