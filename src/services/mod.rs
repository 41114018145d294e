pub mod period_watcher;

pub use period_watcher::PeriodWatcher;
