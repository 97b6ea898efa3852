//! Two-phase upload protocol value objects.

pub mod reservation;

pub use reservation::{ReservedUpload, UploadReservation, UploadSpec, UploadState};
