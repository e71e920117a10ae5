pub mod database; // migrate, seed, reset-counts
pub mod people;   // export-people, promote-staff
