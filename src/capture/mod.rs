// # Capture Module
//
// Image acquisition: live camera streams, the readiness race that gates
// still capture, and the image payloads handed to the analysis pipeline.

pub mod camera;
pub mod image;
pub mod readiness;
