pub mod point;
pub mod run;
pub mod scan;

pub use point::handle_point;
pub use run::handle_run;
pub use scan::handle_scan;
