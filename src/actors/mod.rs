pub mod cycle_worker;
pub mod report_store;
