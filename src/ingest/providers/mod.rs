pub mod finnhub_news;
pub mod rss;
