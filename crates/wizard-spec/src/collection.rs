//! Add/remove/update operations over the repeatable sub-record lists of an
//! application.
//!
//! Items are addressed by position for the lifetime of a session. Collections
//! that declare a `key_field` can also be addressed by key, which is how
//! checkbox groups (one item per selected code) map onto items.

use serde_json::Value;
use tracing::debug;

use crate::application::{Application, Item};
use crate::definition::Form;
use crate::derive::{self, FieldRef};
use crate::error::CollectionError;
use crate::spec::CollectionSpec;

fn spec_for<'a>(form: &'a Form, name: &str) -> Result<&'a CollectionSpec, CollectionError> {
    form.collection(name)
        .ok_or_else(|| CollectionError::UnknownCollection(name.to_string()))
}

/// Fresh item: declared field defaults overlaid with the caller's values.
pub fn new_item(spec: &CollectionSpec, overrides: Item) -> Item {
    let mut item: Item = spec
        .fields
        .iter()
        .map(|field| (field.name.clone(), field.initial_value()))
        .collect();
    item.extend(overrides);
    item
}

/// Appends one item and returns its index.
///
/// Only an unknown collection or a declared maximum can refuse the append.
pub fn add_item(
    form: &Form,
    app: &mut Application,
    name: &str,
    defaults: Item,
) -> Result<usize, CollectionError> {
    let spec = spec_for(form, name)?;
    if let Some(unknown) = defaults.keys().find(|field| spec.field(field).is_none()) {
        return Err(CollectionError::UnknownField {
            collection: name.to_string(),
            field: unknown.clone(),
        });
    }
    if let Some(maximum) = spec.max_items
        && app.collection(name).len() >= maximum
    {
        return Err(CollectionError::AboveMaximumCount {
            collection: name.to_string(),
            maximum,
        });
    }
    let item = new_item(spec, defaults);
    let items = app.collection_mut(name);
    items.push(item);
    let index = items.len() - 1;
    debug!(collection = name, index, "collection item added");
    for field in &spec.fields {
        derive::apply(
            form,
            app,
            FieldRef::Item {
                collection: name,
                index,
                field: &field.name,
            },
        );
    }
    Ok(index)
}

/// Removes the item at `index`; later items shift down by one.
///
/// Refuses to go below the collection's `min_items`.
pub fn remove_item(
    form: &Form,
    app: &mut Application,
    name: &str,
    index: usize,
) -> Result<Item, CollectionError> {
    let spec = spec_for(form, name)?;
    let len = app.collection(name).len();
    if index >= len {
        return Err(CollectionError::IndexOutOfRange {
            collection: name.to_string(),
            index,
        });
    }
    if len <= spec.min_items {
        return Err(CollectionError::BelowMinimumCount {
            collection: name.to_string(),
            minimum: spec.min_items,
        });
    }
    let removed = app.collection_mut(name).remove(index);
    app.unpin_under(&format!("/{}/", name));
    debug!(collection = name, index, "collection item removed");
    Ok(removed)
}

/// Writes one field of one item, then runs the item-scoped derivations.
/// Returns the derived paths that changed.
pub fn update_item(
    form: &Form,
    app: &mut Application,
    name: &str,
    index: usize,
    field: &str,
    value: Value,
) -> Result<Vec<String>, CollectionError> {
    let spec = spec_for(form, name)?;
    if spec.field(field).is_none() {
        return Err(CollectionError::UnknownField {
            collection: name.to_string(),
            field: field.to_string(),
        });
    }
    let at = FieldRef::Item {
        collection: name,
        index,
        field,
    };
    let Some(current) = derive::read(app, at).cloned().or_else(|| {
        (index < app.collection(name).len()).then_some(Value::Null)
    }) else {
        return Err(CollectionError::IndexOutOfRange {
            collection: name.to_string(),
            index,
        });
    };
    if current == value {
        return Ok(Vec::new());
    }
    if form.is_derived(Some(name), field) {
        app.pin(&at.pin_key());
    }
    derive::write(app, at, value);
    Ok(derive::apply(form, app, at))
}

/// Position and contents of the item whose key field equals `key`.
pub fn find_by_key<'a>(
    form: &Form,
    app: &'a Application,
    name: &str,
    key: &str,
) -> Result<Option<(usize, &'a Item)>, CollectionError> {
    let spec = spec_for(form, name)?;
    let key_field = spec
        .key_field
        .as_deref()
        .ok_or_else(|| CollectionError::NotKeyed(name.to_string()))?;
    Ok(app
        .collection(name)
        .iter()
        .enumerate()
        .find(|(_, item)| {
            item.get(key_field)
                .and_then(Value::as_str)
                .is_some_and(|candidate| candidate.trim() == key.trim())
        }))
}

/// Checkbox-style selection over a keyed collection.
///
/// Turning a key on reuses a blank placeholder item when one exists, so a
/// collection that starts with its minimum of empty items does not keep
/// them around. Turning a key off obeys the removal floor.
pub fn toggle_keyed(
    form: &Form,
    app: &mut Application,
    name: &str,
    key: &str,
    on: bool,
) -> Result<Option<usize>, CollectionError> {
    let existing = find_by_key(form, app, name, key)?.map(|(index, _)| index);
    let spec = spec_for(form, name)?;
    let key_field = spec
        .key_field
        .as_deref()
        .ok_or_else(|| CollectionError::NotKeyed(name.to_string()))?;
    match (on, existing) {
        (true, Some(index)) => Ok(Some(index)),
        (true, None) => {
            let placeholder = app.collection(name).iter().position(|item| {
                item.get(key_field)
                    .map(crate::expr::is_blank)
                    .unwrap_or(true)
            });
            match placeholder {
                Some(index) => {
                    update_item(form, app, name, index, key_field, Value::from(key))?;
                    Ok(Some(index))
                }
                None => {
                    let defaults = Item::from([(key_field.to_string(), Value::from(key))]);
                    add_item(form, app, name, defaults).map(Some)
                }
            }
        }
        (false, Some(index)) => remove_item(form, app, name, index).map(|_| None),
        (false, None) => Ok(None),
    }
}

/// Display codes for every item (`STH1`, `STH2`, ...), when configured.
pub fn display_codes(form: &Form, app: &Application, name: &str) -> Vec<Option<String>> {
    match form.collection(name) {
        Some(spec) => (0..app.collection(name).len())
            .map(|index| spec.display_code(index))
            .collect(),
        None => Vec::new(),
    }
}

/// Replaces the whole collection, padding with default items up to the
/// removal floor. Used for prefills and bulk answer imports.
pub fn replace_items(
    form: &Form,
    app: &mut Application,
    name: &str,
    items: Vec<Item>,
) -> Result<(), CollectionError> {
    let spec = spec_for(form, name)?;
    for item in &items {
        if let Some(unknown) = item.keys().find(|field| spec.field(field).is_none()) {
            return Err(CollectionError::UnknownField {
                collection: name.to_string(),
                field: unknown.clone(),
            });
        }
    }
    if let Some(maximum) = spec.max_items
        && items.len() > maximum
    {
        return Err(CollectionError::AboveMaximumCount {
            collection: name.to_string(),
            maximum,
        });
    }
    let mut replacement: Vec<Item> = items
        .into_iter()
        .map(|item| new_item(spec, item))
        .collect();
    while replacement.len() < spec.min_items {
        replacement.push(new_item(spec, Item::new()));
    }
    let count = replacement.len();
    *app.collection_mut(name) = replacement;
    app.unpin_under(&format!("/{}/", name));
    for index in 0..count {
        for field in &spec.fields {
            derive::apply(
                form,
                app,
                FieldRef::Item {
                    collection: name,
                    index,
                    field: &field.name,
                },
            );
        }
    }
    Ok(())
}
