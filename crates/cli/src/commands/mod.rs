pub mod doctor;
pub mod exec;
pub mod onboard;
pub mod run;
pub mod status;
