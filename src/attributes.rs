//! Session attributes and their wire form.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::flash::{self, FlashValue, FLASH_KEY};

/// The structural record exchanged with a backend.
pub type Payload = Map<String, Value>;

/// The attributes of one session.
///
/// Ordinary attributes are JSON values. The reserved `flash` key is kept in a
/// separate slot holding a [`FlashValue`], which is encoded opaquely on its way
/// to the backend and decoded on its way back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    values: Payload,
    flash: Option<FlashValue>,
}

impl Attributes {
    /// Creates an empty set of attributes with no flash.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an ordinary attribute. The flash slot is read with [`flash`](Self::flash).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns an ordinary attribute for in-place updates.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.values.get_mut(key)
    }

    /// Inserts an ordinary attribute, returning the previous value.
    ///
    /// A value inserted under [`FLASH_KEY`] replaces the flash slot instead and
    /// always returns `None`; use [`set_flash`](Self::set_flash) to get the
    /// previous flash back.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        if key == FLASH_KEY {
            self.flash = Some(FlashValue::from(value.into()));
            return None;
        }
        self.values.insert(key, value.into())
    }

    /// Removes an ordinary attribute. The flash slot is cleared with [`take_flash`](Self::take_flash).
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key) || (key == FLASH_KEY && self.flash.is_some())
    }

    /// Number of attributes, counting a present flash slot.
    pub fn len(&self) -> usize {
        self.values.len() + usize::from(self.flash.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the ordinary attributes; the flash slot is not included.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// The current flash value, if any.
    pub fn flash(&self) -> Option<&FlashValue> {
        self.flash.as_ref()
    }

    /// Replaces the flash value, returning the previous one.
    pub fn set_flash(&mut self, value: impl Into<FlashValue>) -> Option<FlashValue> {
        self.flash.replace(value.into())
    }

    /// Removes and returns the flash value.
    pub fn take_flash(&mut self) -> Option<FlashValue> {
        self.flash.take()
    }

    /// Builds the record written to the backend, encoding the flash slot.
    pub fn to_payload(&self) -> Result<Payload> {
        let mut payload = self.values.clone();
        if let Some(flash) = &self.flash {
            payload.insert(FLASH_KEY.to_string(), Value::String(flash::encode(flash)?));
        }
        Ok(payload)
    }

    /// Rebuilds attributes from a backend record, decoding the flash slot.
    pub fn from_payload(mut payload: Payload) -> Result<Self> {
        let flash = match payload.remove(FLASH_KEY) {
            Some(Value::String(opaque)) => Some(flash::decode(&opaque)?),
            Some(other) => {
                return Err(Error::Flash(format!(
                    "expected an encoded string, found {other}"
                )))
            }
            None => None,
        };
        Ok(Self {
            values: payload,
            flash,
        })
    }
}

impl From<Payload> for Attributes {
    /// Treats every entry as an ordinary attribute, routing `flash` to the flash slot.
    fn from(payload: Payload) -> Self {
        payload.into_iter().collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (key, value) in iter {
            attributes.insert(key, value);
        }
        attributes
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn payload_without_flash_is_unchanged() {
        let mut attributes = Attributes::new();
        attributes.insert("counter", 3);
        attributes.insert("nested", json!({"a": [1, 2, {"b": null}]}));

        let payload = attributes.to_payload().unwrap();
        assert_eq!(Value::Object(payload.clone()), json!({
            "counter": 3,
            "nested": {"a": [1, 2, {"b": null}]}
        }));
        assert_eq!(Attributes::from_payload(payload).unwrap(), attributes);
    }

    #[test]
    fn flash_is_opaque_on_the_wire() {
        let mut attributes = Attributes::new();
        attributes.insert("user", "alice");
        attributes.set_flash(FlashValue::Map(vec![(
            FlashValue::symbol("notice"),
            "saved".into(),
        )]));

        let payload = attributes.to_payload().unwrap();
        assert!(payload[FLASH_KEY].is_string());
        assert_eq!(payload["user"], json!("alice"));

        let back = Attributes::from_payload(payload).unwrap();
        assert_eq!(back, attributes);
    }

    #[test]
    fn plain_flash_insert_goes_to_the_flash_slot() {
        let mut attributes = Attributes::new();
        assert_eq!(attributes.insert(FLASH_KEY, json!({"notice": "hi"})), None);

        assert!(attributes.get(FLASH_KEY).is_none());
        assert!(attributes.contains_key(FLASH_KEY));
        assert_eq!(attributes.len(), 1);
        assert_eq!(
            attributes.flash(),
            Some(&FlashValue::Map(vec![("notice".into(), "hi".into())]))
        );
    }

    #[test]
    fn replacing_the_flash_hands_back_the_old_value() {
        let mut attributes = Attributes::new();
        assert_eq!(attributes.set_flash("first"), None);
        assert_eq!(
            attributes.set_flash("second"),
            Some(FlashValue::from("first"))
        );

        // A plain insert also replaces the slot, but does not return it.
        assert_eq!(attributes.insert(FLASH_KEY, "third"), None);
        assert_eq!(attributes.take_flash(), Some(FlashValue::from("third")));
        assert!(attributes.is_empty());
    }

    #[test]
    fn non_string_flash_in_payload_is_rejected() {
        let mut payload = Payload::new();
        payload.insert(FLASH_KEY.to_string(), json!({"notice": "raw"}));
        assert!(matches!(
            Attributes::from_payload(payload),
            Err(Error::Flash(_))
        ));
    }

    #[test]
    fn corrupt_flash_in_payload_is_rejected() {
        let mut payload = Payload::new();
        payload.insert(FLASH_KEY.to_string(), json!("%%%"));
        assert!(Attributes::from_payload(payload).is_err());
    }
}
