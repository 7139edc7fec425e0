//! In-memory table of schema-less records
//!
//! Records live in insertion order in a plain `Vec`; every scan walks that
//! order. Mutating scans match first and mutate second, so a logic fault
//! mid-scan never leaves the table half-mutated.

use serde_json::Value;

use crate::eval::{Environment, Predicate, UpdateProgram};

use super::errors::{TableError, TableResult};
use super::sorter::RecordSorter;

/// Field a tagged table checks on every inserted or replacement record
pub const TYPE_FIELD: &str = "_type";

/// One named table of records
#[derive(Debug, Clone)]
pub struct MemoryTable {
    name: String,
    item_type: Option<String>,
    rows: Vec<Value>,
}

impl MemoryTable {
    /// Create an empty table, optionally bound to an item-type tag
    pub fn new(name: impl Into<String>, item_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            item_type,
            rows: Vec::new(),
        }
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Item-type tag, when the table is typed
    pub fn item_type(&self) -> Option<&str> {
        self.item_type.as_deref()
    }

    /// Number of records currently stored
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no records
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Validate a record against the item-type tag, when one is set
    fn validate(&self, record: &Value) -> TableResult<()> {
        let expected = match &self.item_type {
            Some(tag) => tag,
            None => return Ok(()),
        };
        let actual = record.get(TYPE_FIELD).and_then(Value::as_str);
        if actual != Some(expected.as_str()) {
            return Err(TableError::TypeMismatch {
                expected: expected.clone(),
            });
        }
        Ok(())
    }

    /// Append one record. Returns the inserted count (always 1).
    pub fn add(&mut self, record: Value) -> TableResult<usize> {
        self.validate(&record)?;
        self.rows.push(record);
        Ok(1)
    }

    /// All records matching the predicate, in table order
    pub fn get(&self, predicate: &Predicate, env: &Environment) -> TableResult<Vec<Value>> {
        let mut matched = Vec::new();
        for row in &self.rows {
            if predicate.test(row, env)? {
                matched.push(row.clone());
            }
        }
        Ok(matched)
    }

    /// Count of records matching the predicate
    pub fn count(&self, predicate: &Predicate, env: &Environment) -> TableResult<usize> {
        let mut count = 0;
        for row in &self.rows {
            if predicate.test(row, env)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// First record matching the predicate, or `None` when nothing matches
    pub fn find(&self, predicate: &Predicate, env: &Environment) -> TableResult<Option<Value>> {
        for row in &self.rows {
            if predicate.test(row, env)? {
                return Ok(Some(row.clone()));
            }
        }
        Ok(None)
    }

    /// Remove all records matching the predicate. Returns the removed count.
    pub fn delete(&mut self, predicate: &Predicate, env: &Environment) -> TableResult<usize> {
        let matched = self.match_mask(predicate, env)?;
        let removed = matched.iter().filter(|is_match| **is_match).count();

        let mut mask = matched.into_iter();
        self.rows.retain(|_| !mask.next().unwrap_or(false));
        Ok(removed)
    }

    /// Substitute a deep copy of `template` for every matching record.
    ///
    /// The template is validated like `add` before any matching happens;
    /// a validation failure aborts with no mutation.
    pub fn replace(
        &mut self,
        template: &Value,
        predicate: &Predicate,
        env: &Environment,
    ) -> TableResult<usize> {
        self.validate(template)?;

        let matched = self.match_mask(predicate, env)?;
        let mut replaced = 0;
        for (row, is_match) in self.rows.iter_mut().zip(&matched) {
            if *is_match {
                *row = template.clone();
                replaced += 1;
            }
        }
        Ok(replaced)
    }

    /// Run the update program over every matching record, mutating in place.
    ///
    /// No validation against the item-type tag. Updates are staged on copies
    /// and committed only when every matching record updated cleanly.
    pub fn update(
        &mut self,
        program: &UpdateProgram,
        predicate: &Predicate,
        env: &Environment,
    ) -> TableResult<usize> {
        let matched = self.match_mask(predicate, env)?;

        let mut staged: Vec<(usize, Value)> = Vec::new();
        for (index, is_match) in matched.iter().enumerate() {
            if *is_match {
                let mut row = self.rows[index].clone();
                program.apply(&mut row, env)?;
                staged.push((index, row));
            }
        }

        let updated = staged.len();
        for (index, row) in staged {
            self.rows[index] = row;
        }
        Ok(updated)
    }

    /// A sorted page of matching records.
    ///
    /// Every record must carry `sort_property` (absent or null fails with
    /// `MissingSortField` before anything is sorted or filtered). The sorted
    /// copy is walked from `start_row`; earlier rows are skipped without
    /// predicate evaluation, and the walk stops once `max_rows` matches are
    /// collected.
    #[allow(clippy::too_many_arguments)]
    pub fn get_top(
        &self,
        predicate: &Predicate,
        env: &Environment,
        start_row: usize,
        max_rows: usize,
        sort_property: &str,
        descending: bool,
    ) -> TableResult<Vec<Value>> {
        for row in &self.rows {
            let present = matches!(row.get(sort_property), Some(v) if !v.is_null());
            if !present {
                return Err(TableError::MissingSortField {
                    property: sort_property.to_string(),
                });
            }
        }

        let mut ordered = self.rows.clone();
        RecordSorter::sort_by_property(&mut ordered, sort_property, descending);

        let mut page = Vec::new();
        let mut remaining = max_rows;
        for row in ordered.into_iter().skip(start_row) {
            if remaining == 0 {
                break;
            }
            if predicate.test(&row, env)? {
                page.push(row);
                remaining -= 1;
            }
        }
        Ok(page)
    }

    /// Evaluate the predicate over every row, failing the whole scan on the
    /// first fault
    fn match_mask(&self, predicate: &Predicate, env: &Environment) -> TableResult<Vec<bool>> {
        let mut mask = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            mask.push(predicate.test(row, env)?);
        }
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalError;
    use serde_json::json;

    fn compile(source: &str) -> Predicate {
        Predicate::compile(source).unwrap()
    }

    fn names_table() -> MemoryTable {
        let mut table = MemoryTable::new("t", None);
        table.add(json!({"name": "a"})).unwrap();
        table.add(json!({"name": "b"})).unwrap();
        table.add(json!({"name": "c"})).unwrap();
        table
    }

    #[test]
    fn test_add_and_count() {
        let env = Environment::new();
        let table = names_table();
        assert_eq!(table.count(&compile("true"), &env).unwrap(), 3);
        assert_eq!(
            table.count(&compile("item.name == 'b'"), &env).unwrap(),
            1
        );
    }

    #[test]
    fn test_count_equals_get_length() {
        let env = Environment::new();
        let table = names_table();
        let predicate = compile("item.name != 'b'");
        let records = table.get(&predicate, &env).unwrap();
        assert_eq!(records.len(), table.count(&predicate, &env).unwrap());
    }

    #[test]
    fn test_get_preserves_table_order() {
        let env = Environment::new();
        let table = names_table();
        let records = table.get(&compile("item.name != 'b'"), &env).unwrap();
        assert_eq!(records, vec![json!({"name": "a"}), json!({"name": "c"})]);
    }

    #[test]
    fn test_find_first_match_or_none() {
        let env = Environment::new();
        let table = names_table();
        assert_eq!(
            table.find(&compile("item.name != 'a'"), &env).unwrap(),
            Some(json!({"name": "b"}))
        );
        assert_eq!(
            table.find(&compile("item.name == 'z'"), &env).unwrap(),
            None
        );
    }

    #[test]
    fn test_delete_matching_records() {
        let env = Environment::new();
        let mut table = names_table();
        let removed = table.delete(&compile("item.name == 'b'"), &env).unwrap();
        assert_eq!(removed, 1);

        let rest = table.get(&compile("true"), &env).unwrap();
        assert_eq!(rest, vec![json!({"name": "a"}), json!({"name": "c"})]);
    }

    #[test]
    fn test_replace_substitutes_deep_copies() {
        let env = Environment::new();
        let mut table = names_table();
        let template = json!({"name": "x", "meta": {"fresh": true}});
        let replaced = table
            .replace(&template, &compile("item.name != 'b'"), &env)
            .unwrap();
        assert_eq!(replaced, 2);

        let copies = table.get(&compile("item.name == 'x'"), &env).unwrap();
        assert_eq!(copies.len(), 2);
        assert_eq!(copies[0], copies[1]);
    }

    #[test]
    fn test_typed_table_rejects_mismatched_records() {
        let env = Environment::new();
        let mut table = MemoryTable::new("users", Some("user".to_string()));

        assert!(table.add(json!({"_type": "user", "name": "a"})).is_ok());
        match table.add(json!({"name": "b"})) {
            Err(TableError::TypeMismatch { expected }) => assert_eq!(expected, "user"),
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }

        // Replace validates before mutating anything
        let before = table.get(&compile("true"), &env).unwrap();
        let result = table.replace(&json!({"_type": "ghost"}), &compile("true"), &env);
        assert!(matches!(result, Err(TableError::TypeMismatch { .. })));
        assert_eq!(table.get(&compile("true"), &env).unwrap(), before);
    }

    #[test]
    fn test_update_mutates_without_validation() {
        let env = Environment::new();
        let mut table = MemoryTable::new("users", Some("user".to_string()));
        table.add(json!({"_type": "user", "visits": 1})).unwrap();

        let program = UpdateProgram::compile("item.visits = item.visits + 1").unwrap();
        let updated = table.update(&program, &compile("true"), &env).unwrap();
        assert_eq!(updated, 1);
        assert_eq!(
            table.find(&compile("true"), &env).unwrap().unwrap()["visits"],
            2
        );
    }

    #[test]
    fn test_update_fault_leaves_table_untouched() {
        let env = Environment::new();
        let mut table = MemoryTable::new("t", None);
        table.add(json!({"n": 1})).unwrap();
        table.add(json!({"other": true})).unwrap();

        // Faults on the second record ('+' on null)
        let program = UpdateProgram::compile("item.n = item.n + 1").unwrap();
        let result = table.update(&program, &compile("true"), &env);
        assert!(matches!(result, Err(TableError::Eval(EvalError::Evaluation { .. }))));

        assert_eq!(
            table.get(&compile("true"), &env).unwrap(),
            vec![json!({"n": 1}), json!({"other": true})]
        );
    }

    #[test]
    fn test_predicate_fault_aborts_delete() {
        let env = Environment::new();
        let mut table = MemoryTable::new("t", None);
        table.add(json!({"n": 1})).unwrap();
        table.add(json!({"n": "text"})).unwrap();

        let result = table.delete(&compile("item.n > 0"), &env);
        assert!(matches!(result, Err(TableError::Eval(_))));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_get_top_sorted_page() {
        let env = Environment::new();
        let table = names_table();

        let page = table
            .get_top(&compile("true"), &env, 0, 2, "name", false)
            .unwrap();
        assert_eq!(page, vec![json!({"name": "a"}), json!({"name": "b"})]);

        // Descending with startRow=1 skips "c" and collects "b"
        let page = table
            .get_top(&compile("true"), &env, 1, 1, "name", true)
            .unwrap();
        assert_eq!(page, vec![json!({"name": "b"})]);
    }

    #[test]
    fn test_get_top_start_row_skips_before_filtering() {
        let env = Environment::new();
        let mut table = MemoryTable::new("t", None);
        for n in 1..=5 {
            table.add(json!({"n": n})).unwrap();
        }

        // Sorted: 1 2 3 4 5; startRow=2 skips 1 and 2 before the predicate runs
        let page = table
            .get_top(&compile("item.n % 2 == 1"), &env, 2, 10, "n", false)
            .unwrap();
        assert_eq!(page, vec![json!({"n": 3}), json!({"n": 5})]);
    }

    #[test]
    fn test_get_top_missing_sort_field() {
        let env = Environment::new();
        let mut table = names_table();
        table.add(json!({"other": 1})).unwrap();

        // The offending record would not even match the predicate
        let result = table.get_top(&compile("item.name == 'a'"), &env, 0, 10, "name", false);
        match result {
            Err(TableError::MissingSortField { property }) => assert_eq!(property, "name"),
            other => panic!("Expected MissingSortField, got {:?}", other),
        }
    }

    #[test]
    fn test_get_top_null_sort_field_counts_as_missing() {
        let env = Environment::new();
        let mut table = MemoryTable::new("t", None);
        table.add(json!({"name": null})).unwrap();

        let result = table.get_top(&compile("true"), &env, 0, 1, "name", false);
        assert!(matches!(result, Err(TableError::MissingSortField { .. })));
    }

    #[test]
    fn test_get_top_zero_max_rows() {
        let env = Environment::new();
        let table = names_table();
        let page = table
            .get_top(&compile("true"), &env, 0, 0, "name", false)
            .unwrap();
        assert!(page.is_empty());
    }
}
