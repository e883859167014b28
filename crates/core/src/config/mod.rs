pub mod station_config;
