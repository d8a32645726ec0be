pub mod csv_loader;

pub use csv_loader::{load_candles, load_directory, read_candles};
