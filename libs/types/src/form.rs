//! Form data model shared between host applications and the form service.
//!
//! These records are what actually crosses the process boundary. They carry no
//! behavior beyond basic validity checks; encoding rules live in
//! `formlink-codec` and business semantics live behind the service trait.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a live form instance, allocated by the form service.
///
/// Valid identifiers are strictly positive. Zero and negative values are
/// rejected on the client side before any transport call is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FormId(i64);

impl FormId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> i64 {
        self.0
    }

    /// The service never allocates non-positive identifiers.
    pub const fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for FormId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Grid dimension of a form, in host launcher cells.
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize,
)]
pub enum FormDimension {
    OneByTwo = 1,
    TwoByTwo = 2,
    TwoByFour = 3,
    FourByFour = 4,
    TwoByOne = 5,
}

/// Acquisition state of a form definition, reported by `acquire_form_state`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum FormState {
    /// The service could not determine whether the form can be created.
    Unknown = -1,
    /// The form definition exists but the provider has not prepared it.
    Default = 0,
    /// The form is ready to be created.
    Ready = 1,
}

/// Everything a caller supplies when requesting a new form instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormRequest {
    pub bundle: String,
    pub ability: String,
    pub module: String,
    pub form_name: String,
    pub dimension: Option<FormDimension>,
    pub temporary: bool,
    /// Provider-defined creation parameters. Kept sorted so the wire image
    /// of a request is deterministic.
    pub params: BTreeMap<String, String>,
}

impl FormRequest {
    /// A request is addressable only when all four identity fields are set.
    pub fn has_identity(&self) -> bool {
        !self.bundle.is_empty()
            && !self.ability.is_empty()
            && !self.module.is_empty()
            && !self.form_name.is_empty()
    }
}

/// Description of a live form instance as tracked by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormInfo {
    pub id: FormId,
    pub bundle: String,
    pub ability: String,
    pub module: String,
    pub name: String,
    pub dimension: FormDimension,
    pub temporary: bool,
    pub visible: bool,
    pub update_enabled: bool,
}

/// Filter for `get_forms_info`. An empty filter matches every form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormInfoFilter {
    pub bundle: Option<String>,
    pub module: Option<String>,
}

impl FormInfoFilter {
    pub fn is_empty(&self) -> bool {
        self.bundle.is_none() && self.module.is_none()
    }

    pub fn matches(&self, info: &FormInfo) -> bool {
        if let Some(bundle) = &self.bundle {
            if info.bundle != *bundle {
                return false;
            }
        }
        if let Some(module) = &self.module {
            if info.module != *module {
                return false;
            }
        }
        true
    }
}

/// Refresh payload pushed by a provider through `update_form`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormBindingData {
    /// Serialized content blob, interpreted by the renderer only.
    pub content: String,
    /// Names of images referenced by the content.
    pub images: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_id_validity() {
        assert!(FormId::new(1).is_valid());
        assert!(FormId::new(i64::MAX).is_valid());
        assert!(!FormId::new(0).is_valid());
        assert!(!FormId::new(-1).is_valid());
    }

    #[test]
    fn dimension_from_primitive() {
        assert_eq!(FormDimension::try_from(2).unwrap(), FormDimension::TwoByTwo);
        assert!(FormDimension::try_from(0).is_err());
        assert!(FormDimension::try_from(99).is_err());
    }

    #[test]
    fn form_state_roundtrips_negative_discriminant() {
        assert_eq!(FormState::try_from(-1).unwrap(), FormState::Unknown);
        assert_eq!(i32::from(FormState::Ready), 1);
    }

    #[test]
    fn request_identity() {
        let mut req = FormRequest {
            bundle: "com.example.weather".into(),
            ability: "WeatherAbility".into(),
            module: "entry".into(),
            form_name: "widget".into(),
            ..Default::default()
        };
        assert!(req.has_identity());
        req.module.clear();
        assert!(!req.has_identity());
    }

    #[test]
    fn empty_filter_matches_everything() {
        let info = FormInfo {
            id: FormId::new(7),
            bundle: "com.example.clock".into(),
            ability: "ClockAbility".into(),
            module: "entry".into(),
            name: "clock".into(),
            dimension: FormDimension::TwoByTwo,
            temporary: false,
            visible: true,
            update_enabled: true,
        };
        assert!(FormInfoFilter::default().matches(&info));
        let filter = FormInfoFilter {
            bundle: Some("com.example.clock".into()),
            module: Some("feature".into()),
        };
        assert!(!filter.matches(&info));
    }
}
