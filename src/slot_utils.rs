use serde_json::Value;

use crate::ontology::{
    tag_name_to_slot_name, Entity, IntentDefinition, Slot, SlotCollection, SlotDefinition,
    SlotEntry, Token, INSIDE_PREFIX, OUTSIDE,
};

/// Reassembles a BIO tag sequence into a structured slot collection.
///
/// Tokens and tags are paired positionally; when the lengths differ the
/// unmatched tail is dropped. Predicted slot names absent from the intent's
/// declared slots are silently excluded, so tagger output drifting from the
/// intent schema cannot leak undeclared slots into the result.
pub fn assemble_slot_collection(
    tokens: &[Token],
    tags: &[String],
    intent: &IntentDefinition,
    entities: &[Entity],
) -> SlotCollection {
    let mut collection = SlotCollection::new();

    for (token, tag) in tokens.iter().zip(tags.iter()) {
        if tag == OUTSIDE {
            continue;
        }
        let slot_name = tag_name_to_slot_name(tag);
        let definition = match intent.slots.iter().find(|d| d.name == slot_name) {
            Some(definition) => definition,
            None => continue,
        };

        let is_inside = tag.starts_with(INSIDE_PREFIX);
        let existing_single = match collection.get(&slot_name) {
            Some(SlotEntry::Single(_)) => true,
            _ => false,
        };

        if is_inside && existing_single {
            // Multi-token span accumulation
            if let Some(SlotEntry::Single(slot)) = collection.get_mut(&slot_name) {
                append_token_value(slot, token);
            }
        } else if !is_inside && collection.get(&slot_name).is_some() {
            // A second beginning-tagged span under the same name starts or
            // extends an array
            let slot = resolve_slot(token, definition, entities);
            collection.push_additional(&slot_name, slot);
        } else {
            let slot = resolve_slot(token, definition, entities);
            collection.insert_single(&slot_name, slot);
        }
    }
    collection
}

/// The slot value comes from a covering entity of the declared entity type
/// when the entity recognizer supplied one, otherwise from the raw surface
/// text.
fn resolve_slot(token: &Token, definition: &SlotDefinition, entities: &[Entity]) -> Slot {
    let covering = entities.iter().find(|entity| {
        entity.name == definition.entity
            && entity.meta.start <= token.start
            && entity.meta.end >= token.end
    });
    match covering {
        Some(entity) => Slot {
            name: definition.name.clone(),
            value: entity.data.value.clone(),
            entity: Some(entity.clone()),
        },
        None => Slot {
            name: definition.name.clone(),
            value: Value::String(token.value.clone()),
            entity: None,
        },
    }
}

fn append_token_value(slot: &mut Slot, token: &Token) {
    let joined = match &slot.value {
        Value::String(existing) => format!("{} {}", existing, token.value),
        other => format!("{} {}", other, token.value),
    };
    slot.value = Value::String(joined);
}
