mod atomicity;
mod concurrency;
mod properties;
mod scenarios;
