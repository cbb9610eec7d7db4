// Background jobs run on the cron scheduler

pub mod slug_cache_sweeper;
