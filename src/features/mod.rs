pub mod smartcitizen;
