pub mod patient;

pub use patient::{bmi, Gender, NewPatient, Patient, PatientUpdate, PatientView, Verdict};
