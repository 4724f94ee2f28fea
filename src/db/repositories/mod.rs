pub mod sensor_logs;

pub use sensor_logs::LogWriter;
