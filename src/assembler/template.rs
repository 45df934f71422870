//! Block template construction.
//!
//! A block's recipe (division key → games per block) becomes a per-slot
//! division assignment: the recipe is rescaled to the block size when its
//! counts don't sum there, interleaved so divisions alternate through the
//! block, and cycled over every slot so no trailing slot is ever left
//! unassigned.

use crate::models::BlockRecipe;

/// Rescales a recipe so its counts sum to `block_size`.
///
/// Counts are scaled proportionally (floored), then the remainder is
/// distributed round-robin over the division keys in sorted order. A
/// recipe already summing to `block_size` is returned unchanged.
pub fn scale_recipe(recipe: &BlockRecipe, block_size: usize) -> BlockRecipe {
    let total: usize = recipe.values().sum();
    if total == 0 || total == block_size {
        return recipe.clone();
    }

    let mut scaled: BlockRecipe = recipe
        .iter()
        .map(|(d, c)| (d.clone(), c * block_size / total))
        .collect();
    let remainder = block_size - scaled.values().sum::<usize>();
    let order: Vec<String> = recipe.keys().cloned().collect();
    for i in 0..remainder {
        if let Some(count) = scaled.get_mut(&order[i % order.len()]) {
            *count += 1;
        }
    }
    scaled
}

/// Builds the interleaved division template for one block.
///
/// Divisions alternate (one slot each in rotation) until their scaled
/// counts exhaust, so a block never front-loads a single division. The
/// returned template has exactly `block_size` entries; an empty recipe
/// yields an empty template (every slot open to any division).
pub fn block_template(recipe: &BlockRecipe, block_size: usize) -> Vec<String> {
    if recipe.is_empty() || block_size == 0 {
        return Vec::new();
    }
    let mut remain = scale_recipe(recipe, block_size);
    let order: Vec<String> = remain.keys().cloned().collect();

    let mut template = Vec::with_capacity(block_size);
    while template.len() < block_size {
        let before = template.len();
        for d in &order {
            if template.len() >= block_size {
                break;
            }
            if let Some(count) = remain.get_mut(d) {
                if *count > 0 {
                    template.push(d.clone());
                    *count -= 1;
                }
            }
        }
        if template.len() == before {
            break; // counts exhausted below block_size; cycling covers the rest
        }
    }
    template
}

/// Division assignment for every slot index.
///
/// Slot `i` takes the `(i % block_size)`-th template entry, cycling the
/// template when a block is longer than it (`template[k % len]`) so the
/// template never "runs out". `None` means any division may fill the slot.
pub fn assign_divisions(
    slot_count: usize,
    block_size: usize,
    template: &[String],
) -> Vec<Option<String>> {
    if template.is_empty() || block_size == 0 {
        return vec![None; slot_count];
    }
    (0..slot_count)
        .map(|i| {
            let k = i % block_size;
            Some(template[k % template.len()].clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(entries: &[(&str, usize)]) -> BlockRecipe {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_scale_noop_when_sum_matches() {
        let r = recipe(&[("div12", 6), ("div8", 4)]);
        assert_eq!(scale_recipe(&r, 10), r);
    }

    #[test]
    fn test_scale_up_distributes_remainder() {
        let r = recipe(&[("div12", 3), ("div8", 2)]);
        let scaled = scale_recipe(&r, 10);
        assert_eq!(scaled.values().sum::<usize>(), 10);
        assert_eq!(scaled["div12"], 6);
        assert_eq!(scaled["div8"], 4);
    }

    #[test]
    fn test_scale_down() {
        let r = recipe(&[("div12", 6), ("div8", 4)]);
        let scaled = scale_recipe(&r, 5);
        assert_eq!(scaled.values().sum::<usize>(), 5);
        assert_eq!(scaled["div12"], 3);
        assert_eq!(scaled["div8"], 2);
    }

    #[test]
    fn test_template_interleaves() {
        let template = block_template(&recipe(&[("div12", 6), ("div8", 4)]), 10);
        assert_eq!(template.len(), 10);
        assert_eq!(template.iter().filter(|d| *d == "div12").count(), 6);
        assert_eq!(template.iter().filter(|d| *d == "div8").count(), 4);
        // Alternation while both divisions have supply.
        assert_eq!(template[0], "div12");
        assert_eq!(template[1], "div8");
        assert_eq!(template[2], "div12");
        assert_eq!(template[3], "div8");
    }

    #[test]
    fn test_empty_recipe_leaves_slots_open() {
        assert!(block_template(&BlockRecipe::new(), 10).is_empty());
        let assigned = assign_divisions(4, 10, &[]);
        assert_eq!(assigned, vec![None, None, None, None]);
    }

    #[test]
    fn test_assignment_cycles_template() {
        // Template shorter than the block: entries cycle, no slot left bare.
        let template = vec!["div6".to_string(), "div4".to_string()];
        let assigned = assign_divisions(5, 5, &template);
        let keys: Vec<&str> = assigned.iter().map(|d| d.as_deref().unwrap()).collect();
        assert_eq!(keys, ["div6", "div4", "div6", "div4", "div6"]);
    }

    #[test]
    fn test_assignment_restarts_each_block() {
        let template = block_template(&recipe(&[("div12", 1), ("div8", 1)]), 2);
        let assigned = assign_divisions(5, 2, &template);
        let keys: Vec<&str> = assigned.iter().map(|d| d.as_deref().unwrap()).collect();
        assert_eq!(keys, ["div12", "div8", "div12", "div8", "div12"]);
    }
}
