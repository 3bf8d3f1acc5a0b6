pub mod ip_utils; // Address <-> bit-key conversion
