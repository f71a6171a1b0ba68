//! Hardware variant table: model identifier → physical pin assignment.

use super::PinAssignment;

/// Static description of one hotspot hardware variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantDetails {
    /// Identifier as configured through `VARIANT`.
    pub name: &'static str,
    /// Marketing name, used as the Bluetooth advertisement prefix.
    pub friendly: &'static str,
    /// Short application name.
    pub app_name: &'static str,
    /// BCM pin of the user button (active low).
    pub button: u32,
    /// BCM pin of the status LED (active high).
    pub status: u32,
}

impl VariantDetails {
    pub fn pins(&self) -> PinAssignment {
        PinAssignment {
            button: self.button,
            status: self.status,
        }
    }
}

static VARIANTS: &[VariantDetails] = &[
    VariantDetails {
        name: "NEBHNT-IN1",
        friendly: "Nebra Indoor Hotspot",
        app_name: "Indoor",
        button: 26,
        status: 25,
    },
    VariantDetails {
        name: "NEBHNT-OUT1",
        friendly: "Nebra Outdoor Hotspot",
        app_name: "Outdoor",
        button: 26,
        status: 25,
    },
    VariantDetails {
        name: "NEBHNT-LGT-ZX",
        friendly: "Nebra Light Hotspot",
        app_name: "Light",
        button: 26,
        status: 25,
    },
];

/// Looks up a variant by identifier (case-sensitive, as written on the device label).
pub fn variant_details(name: &str) -> Option<&'static VariantDetails> {
    VARIANTS.iter().find(|v| v.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_variant_resolves_pins() {
        let v = variant_details("NEBHNT-OUT1").expect("variant");
        assert_eq!(v.pins(), PinAssignment { button: 26, status: 25 });
        assert_eq!(v.friendly, "Nebra Outdoor Hotspot");
    }

    #[test]
    fn unknown_variant_is_none() {
        assert!(variant_details("nebhnt-in1").is_none());
        assert!(variant_details("").is_none());
    }
}
