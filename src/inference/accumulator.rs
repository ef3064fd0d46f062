//! Field-type accumulator
//!
//! Keeps one [`FieldTypeState`] per field name for the lifetime of a scan and
//! applies the promotion lattice to every classified sample:
//!
//! - long-text fields stay `string` and ignore their samples
//! - `date` is sticky
//! - `string` absorbs only further strings
//! - numeric fields widen `int` to `float` and fall to `string` on text
//!
//! Two accumulators built over consecutive slices of a corpus can be merged;
//! the result equals what a single sequential pass would have produced.

use std::collections::BTreeMap;

use tracing::debug;

use super::classify::classify;
use super::config::SizingConfig;
use super::normalize::normalize;
use super::types::{FieldType, FieldTypeState, RawValue, Record, TypedValue};

/// Per-field type state for one corpus scan
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTypeAccumulator {
    fields: BTreeMap<String, FieldTypeState>,
}

impl Default for FieldTypeAccumulator {
    fn default() -> Self {
        Self::new(&SizingConfig::default())
    }
}

impl FieldTypeAccumulator {
    /// Create an accumulator seeded with the configured long-text fields
    pub fn new(config: &SizingConfig) -> Self {
        Self::with_long_text(config.long_text_fields.iter().map(String::as_str))
    }

    /// Create an accumulator seeded with an explicit long-text set
    pub fn with_long_text<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let fields = names
            .into_iter()
            .map(|name| (name.to_string(), FieldTypeState::long_text(name)))
            .collect();
        Self { fields }
    }

    /// Make sure `name` has a state, creating it as `unknown` if new
    pub fn register(&mut self, name: &str) -> &mut FieldTypeState {
        if !self.fields.contains_key(name) {
            debug!("New field: {name}");
        }
        self.fields
            .entry(name.to_string())
            .or_insert_with(|| FieldTypeState::new(name))
    }

    /// Normalize, classify and accumulate one value
    pub fn observe(&mut self, name: &str, value: &RawValue) {
        let state = self.register(name);
        if value.is_container() {
            return;
        }
        if let Some(typed) = classify(&normalize(value)) {
            state.absorb(&typed);
        }
    }

    /// Accumulate every field of a record
    pub fn observe_record(&mut self, record: &Record) {
        for (name, value) in record {
            self.observe(name, value);
        }
    }

    /// Fold `later` into `self`, as if its records had been observed after ours
    pub fn merge(&mut self, later: FieldTypeAccumulator) {
        for (name, state) in later.fields {
            match self.fields.get_mut(&name) {
                Some(existing) => existing.merge(&state),
                None => {
                    self.fields.insert(name, state);
                }
            }
        }
    }

    /// State of a single field
    pub fn get(&self, name: &str) -> Option<&FieldTypeState> {
        self.fields.get(name)
    }

    /// All field states, sorted by name
    pub fn fields(&self) -> impl Iterator<Item = &FieldTypeState> {
        self.fields.values()
    }

    /// Consume the accumulator, yielding the states sorted by name
    pub fn into_fields(self) -> Vec<FieldTypeState> {
        self.fields.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FieldTypeState {
    /// Apply one classified sample
    pub fn absorb(&mut self, value: &TypedValue) {
        if self.long_text {
            return;
        }

        if let TypedValue::Text(text) = value {
            self.longest_text = self.longest_text.max(text.chars().count());
        }

        match (self.field_type, value) {
            (FieldType::Date, _) => {}

            (FieldType::String, TypedValue::Text(_)) => {
                self.max_len = self.longest_text;
            }
            (FieldType::String, _) => {}

            (_, TypedValue::Date(_)) => self.become_date(),

            (_, TypedValue::Text(_)) => {
                self.field_type = FieldType::String;
                self.max_len = self.longest_text;
                self.max_val = None;
                self.float_precision = 0;
            }

            (
                _,
                TypedValue::Float {
                    value,
                    fraction_digits,
                },
            ) => {
                self.field_type = FieldType::Float;
                self.float_precision = self.float_precision.max(*fraction_digits);
                self.track_magnitude(value.abs());
            }

            (current, TypedValue::Integer(n)) => {
                if current == FieldType::Unknown {
                    self.field_type = FieldType::Int;
                }
                self.track_magnitude(n.unsigned_abs() as f64);
            }
        }
    }

    /// Fold the state of the same field from a later slice of the corpus
    pub fn merge(&mut self, later: &FieldTypeState) {
        if self.long_text || later.long_text {
            *self = FieldTypeState::long_text(self.name.clone());
            return;
        }

        self.longest_text = self.longest_text.max(later.longest_text);

        match (self.field_type, later.field_type) {
            (FieldType::Date, _) => {}

            (FieldType::String, _) => self.max_len = self.longest_text,

            (_, FieldType::Date) => self.become_date(),

            (_, FieldType::String) => {
                self.field_type = FieldType::String;
                self.max_len = self.longest_text;
                self.max_val = None;
                self.float_precision = 0;
            }

            (_, FieldType::Unknown) => {}

            (current, incoming) => {
                self.field_type = if current == FieldType::Float || incoming == FieldType::Float {
                    FieldType::Float
                } else {
                    FieldType::Int
                };
                self.float_precision = self.float_precision.max(later.float_precision);
                if let Some(magnitude) = later.max_val {
                    self.track_magnitude(magnitude);
                }
            }
        }
    }

    fn become_date(&mut self) {
        self.field_type = FieldType::Date;
        self.max_len = 0;
        self.max_val = None;
        self.float_precision = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn observe_all(acc: &mut FieldTypeAccumulator, name: &str, values: &[RawValue]) {
        for value in values {
            acc.observe(name, value);
        }
    }

    #[test]
    fn test_new_field_starts_unknown() {
        let mut acc = FieldTypeAccumulator::default();
        acc.observe("anexos", &RawValue::Null);
        acc.observe("anexos", &RawValue::List(vec![]));

        let state = acc.get("anexos").unwrap();
        assert_eq!(state.field_type, FieldType::Unknown);
        assert_eq!(state.max_val, None);
        assert_eq!(state.max_len, 0);
    }

    #[test]
    fn test_long_text_fields_are_seeded_and_pinned() {
        let mut acc = FieldTypeAccumulator::default();
        assert_eq!(acc.len(), 11);

        acc.observe("ementa", &RawValue::Integer(5));
        acc.observe("ementa", &text("2024-01-01"));
        acc.observe("ementa", &text("RECURSO ESPECIAL. DIREITO CIVIL."));

        let state = acc.get("ementa").unwrap();
        assert_eq!(state.field_type, FieldType::String);
        assert_eq!(state.max_len, 0);
        assert_eq!(state.max_val, None);
    }

    #[test]
    fn test_int_widens_to_float() {
        let mut acc = FieldTypeAccumulator::default();
        observe_all(
            &mut acc,
            "valor",
            &[RawValue::Integer(-12), RawValue::Float(3.25), RawValue::Integer(40)],
        );

        let state = acc.get("valor").unwrap();
        assert_eq!(state.field_type, FieldType::Float);
        assert_eq!(state.max_val, Some(40.0));
        assert_eq!(state.float_precision, 2);
    }

    #[test]
    fn test_polluting_string_wins_in_any_order() {
        let values = [RawValue::Integer(10), text("n/a"), RawValue::Integer(99999)];

        let mut forward = FieldTypeAccumulator::default();
        observe_all(&mut forward, "quantidade", &values);

        let mut reversed = FieldTypeAccumulator::default();
        let mut backwards = values.to_vec();
        backwards.reverse();
        observe_all(&mut reversed, "quantidade", &backwards);

        for acc in [&forward, &reversed] {
            let state = acc.get("quantidade").unwrap();
            assert_eq!(state.field_type, FieldType::String);
            assert_eq!(state.max_len, 3);
            assert_eq!(state.max_val, None);
        }
    }

    #[test]
    fn test_date_is_sticky() {
        let mut acc = FieldTypeAccumulator::default();
        observe_all(
            &mut acc,
            "dataDecisao",
            &[
                text("2023-05-10"),
                RawValue::Integer(12),
                text("sem data"),
                RawValue::Float(1.5),
            ],
        );
        assert_eq!(acc.get("dataDecisao").unwrap().field_type, FieldType::Date);
    }

    #[test]
    fn test_string_ignores_numbers_and_dates() {
        let mut acc = FieldTypeAccumulator::default();
        observe_all(
            &mut acc,
            "classe",
            &[text("REsp"), RawValue::Integer(123456), text("2024-01-01"), text("AgInt")],
        );
        let state = acc.get("classe").unwrap();
        assert_eq!(state.field_type, FieldType::String);
        assert_eq!(state.max_len, 5);
    }

    #[test]
    fn test_numeric_to_string_drops_numeric_history() {
        let mut acc = FieldTypeAccumulator::default();
        observe_all(&mut acc, "codigo", &[RawValue::Float(123.456), text("AB")]);
        let state = acc.get("codigo").unwrap();
        assert_eq!(state.field_type, FieldType::String);
        assert_eq!(state.max_len, 2);
        assert_eq!(state.max_val, None);
        assert_eq!(state.float_precision, 0);
    }

    #[test]
    fn test_max_len_uses_normalized_length() {
        let mut acc = FieldTypeAccumulator::default();
        acc.observe("nome", &text("  Maria  Silva\n"));
        assert_eq!(acc.get("nome").unwrap().max_len, 11);
    }

    #[test]
    fn test_observe_record_registers_every_key() {
        let mut record = Record::new();
        record.insert("id_origem".to_string(), RawValue::Integer(1));
        record.insert("partes".to_string(), RawValue::List(vec![text("A")]));
        record.insert("relator".to_string(), RawValue::Null);

        let mut acc = FieldTypeAccumulator::with_long_text([]);
        acc.observe_record(&record);

        assert_eq!(acc.len(), 3);
        assert_eq!(acc.get("id_origem").unwrap().field_type, FieldType::Int);
        assert_eq!(acc.get("partes").unwrap().field_type, FieldType::Unknown);
        assert_eq!(acc.get("relator").unwrap().field_type, FieldType::Unknown);
    }

    #[test]
    fn test_merge_matches_sequential() {
        let samples: Vec<(&str, RawValue)> = vec![
            ("a", RawValue::Integer(5)),
            ("b", text("2024-02-01")),
            ("c", text("curto")),
            ("a", RawValue::Float(2.125)),
            ("b", text("um texto bem mais longo")),
            ("c", RawValue::Integer(7)),
            ("d", RawValue::Integer(300)),
            ("a", RawValue::Integer(1_000)),
            ("c", text("um texto maior")),
            ("d", text("x")),
            ("e", RawValue::Null),
            ("ementa", RawValue::Integer(1)),
        ];

        let mut sequential = FieldTypeAccumulator::default();
        for (name, value) in &samples {
            sequential.observe(name, value);
        }

        for split in 0..=samples.len() {
            let mut first = FieldTypeAccumulator::default();
            let mut second = FieldTypeAccumulator::default();
            for (name, value) in &samples[..split] {
                first.observe(name, value);
            }
            for (name, value) in &samples[split..] {
                second.observe(name, value);
            }
            first.merge(second);
            assert_eq!(first, sequential, "split at {split}");
        }
    }

    #[test]
    fn test_merge_string_then_late_text_after_date() {
        // The later slice saw a date before its text; the earlier slice already
        // made the field a string, so the late text must still count.
        let mut sequential = FieldTypeAccumulator::with_long_text([]);
        observe_all(
            &mut sequential,
            "orgao",
            &[text("STJ"), text("2024-01-01"), text("Terceira Turma")],
        );

        let mut first = FieldTypeAccumulator::with_long_text([]);
        first.observe("orgao", &text("STJ"));
        let mut second = FieldTypeAccumulator::with_long_text([]);
        observe_all(&mut second, "orgao", &[text("2024-01-01"), text("Terceira Turma")]);
        assert_eq!(second.get("orgao").unwrap().field_type, FieldType::Date);

        first.merge(second);
        assert_eq!(first, sequential);
        assert_eq!(first.get("orgao").unwrap().max_len, 14);
    }
}
