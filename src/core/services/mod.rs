pub mod customer_service;
pub mod dates;
pub mod export_service;
pub mod filter_pipeline;
pub mod option_cache;
pub mod projection;
pub mod technician_normalizer;
