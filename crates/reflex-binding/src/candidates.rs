use std::collections::VecDeque;

use tracing::debug;

use crate::member::MemberStep;
use crate::model::{ObjectModel, ObjectRef, TypeName};
use crate::path::{ComponentMemberPath, MemberPath};

/// Breadth-first discovery of readable member paths reachable from the behaviors
/// attached to `root`.
///
/// Only paths whose value type is assignable to `filter` are returned (all paths
/// when `filter` is `None`). A path never revisits a declaring type already used by
/// one of its earlier steps, and never grows past `max_depth` steps. Results are
/// ordered shortest first. Authoring-time only; this walks the whole type graph.
pub fn enumerate_candidates(
    model: &dyn ObjectModel,
    root: ObjectRef,
    filter: Option<&TypeName>,
    max_depth: usize,
) -> Vec<ComponentMemberPath> {
    let mut results = Vec::new();
    let mut queue: VecDeque<(ObjectRef, MemberPath, TypeName)> = VecDeque::new();

    for behavior in model.attached_behaviors(root) {
        if let Some(ty) = model.object_type(behavior) {
            queue.push_back((behavior, MemberPath::new(), ty));
        }
    }

    while let Some((behavior, path, ty)) = queue.pop_front() {
        if path.len() >= max_depth {
            continue;
        }

        for member in model.members(&ty) {
            let revisits = path
                .steps()
                .iter()
                .any(|s| s.declaring_type() == &member.declaring_type);
            if revisits {
                continue;
            }

            let value_type = member.value_type.clone();
            let step = MemberStep::from_info(model, member);
            let Ok(next) = path.append(step, model) else {
                continue;
            };

            if filter.map_or(true, |f| model.is_assignable(f, &value_type)) {
                results.push(ComponentMemberPath::new(behavior, next.clone()));
            }
            if !value_type.is_primitive() {
                queue.push_back((behavior, next, value_type));
            }
        }
    }

    debug!(
        target: "binding",
        "Enumerated {} candidate(s) on {} (filter {:?}, depth {})",
        results.len(),
        root,
        filter.map(|f| f.as_str()),
        max_depth
    );
    results
}
