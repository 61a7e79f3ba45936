//! Output-schema resolution for freshly matched nodes.
//!
//! Policy, first applicable rule wins:
//!
//! 1. a fixed descriptor other than `unknown` is used verbatim;
//! 2. `unknown`/sole with exactly one binding propagates that binding's schema;
//! 3. a union over bindings collects the present bindings' schemas, flattens
//!    nested unions, deduplicates, sorts by rendered text and joins them;
//! 4. anything else is `unknown`.

use std::collections::BTreeMap;

use crate::ast::Bindings;
use crate::grammar::builder::CompiledResult;
use crate::schema::TypeDescriptor;

pub(crate) fn output_schema(result: &CompiledResult, bindings: &Bindings) -> TypeDescriptor {
    match result {
        CompiledResult::Fixed(descriptor) => descriptor.clone(),
        CompiledResult::Sole => match bindings.values().next() {
            Some(binding) if bindings.len() == 1 => binding.output_schema(),
            _ => TypeDescriptor::Unknown,
        },
        CompiledResult::Union(names) => {
            let schemas = names
                .iter()
                .filter_map(|name| bindings.get(name))
                .map(|binding| binding.output_schema())
                .collect();
            sorted_union(schemas)
        }
    }
}

/// Deduplicated, textually sorted union of `schemas`.
pub fn sorted_union(schemas: Vec<TypeDescriptor>) -> TypeDescriptor {
    let mut members: BTreeMap<String, TypeDescriptor> = BTreeMap::new();
    for schema in schemas {
        for member in schema.members() {
            members.entry(member.to_string()).or_insert_with(|| member.clone());
        }
    }
    TypeDescriptor::union(members.into_values().collect())
}
