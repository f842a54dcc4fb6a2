//! Combined bioregion/EVC code
//!
//! "VVP" + 55 -> "VVP_0055", "STIF" + 132 -> "STIF0132". Codes of up to three
//! characters take an underscore so every code lines up at the same width.

/// Build the combined code for a bioregion and EVC number
///
/// The EVC number is truncated toward zero and zero-padded to 4 digits.
pub fn format_bioevc(bioregion_code: &str, vegetation_class: f64) -> String {
    let evc = vegetation_class.trunc() as i64;
    if bioregion_code.chars().count() <= 3 {
        format!("{}_{:04}", bioregion_code, evc)
    } else {
        format!("{}{:04}", bioregion_code, evc)
    }
}
