pub mod check;
pub mod concat;
pub mod init_config;
pub mod mix;
pub mod overlay;
pub mod probe;
pub mod qr;
pub mod run;
