//! End-to-end selection scenarios over an `ItemTree`.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use horizon_bind::model::{AddOutcome, VisualId};
use horizon_bind::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Inbox {
    tree: Arc<ItemTree>,
    root: NodeId,
    messages: Vec<NodeId>,
}

fn inbox(count: usize) -> Inbox {
    let tree = Arc::new(ItemTree::new());
    let root = tree.create_root("inbox", "Inbox");
    let messages = (0..count)
        .map(|i| {
            tree.add_child(root, &format!("m{i}"), &format!("Message {i}"))
                .unwrap()
        })
        .collect();
    Inbox {
        tree,
        root,
        messages,
    }
}

fn controller(inbox: &Inbox, options: SelectionOptions) -> SelectionController<NodeId> {
    SelectionController::new(
        options.with_delayed_select(false),
        inbox.tree.clone(),
        inbox.tree.clone(),
    )
}

fn assert_unique(items: &[NodeId]) {
    let unique: HashSet<_> = items.iter().collect();
    assert_eq!(unique.len(), items.len(), "duplicate in {items:?}");
}

/// Deterministic pseudo-random sequence for operation mixes.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

fn run_mix(c: &mut SelectionController<NodeId>, messages: &[NodeId], seed: u64) {
    let mut rng = Lcg(seed);
    for _ in 0..300 {
        let item = messages[rng.next(messages.len())];
        match rng.next(6) {
            0 => {
                c.select(item, SelectFlags::NONE);
            }
            1 => {
                c.select(item, SelectFlags::CTRL);
            }
            2 => {
                c.select(item, SelectFlags::SHIFT);
            }
            3 => {
                c.clear_selection(rng.next(2) == 0, false);
            }
            4 => {
                c.select(item, SelectFlags::CTRL.with_visual_only());
            }
            _ => {
                c.select_next();
            }
        }
        assert_unique(c.selected_items());
        if let Some(primary) = c.primary() {
            assert!(c.is_selected(primary));
        }
    }
}

#[test]
fn test_selection_never_has_duplicates() {
    init_tracing();
    let inbox = inbox(8);
    for seed in [1, 7, 42, 1234] {
        let mut c = controller(&inbox, SelectionOptions::default());
        run_mix(&mut c, &inbox.messages, seed);
    }
}

#[test]
fn test_single_mode_holds_at_most_one() {
    init_tracing();
    let inbox = inbox(8);
    for seed in [3, 99] {
        let mut c = controller(&inbox, SelectionOptions::single());
        let mut rng = Lcg(seed);
        for _ in 0..200 {
            let item = inbox.messages[rng.next(inbox.messages.len())];
            let flags = match rng.next(3) {
                0 => SelectFlags::NONE,
                1 => SelectFlags::CTRL,
                _ => SelectFlags::SHIFT,
            };
            c.select(item, flags);
            assert!(c.selected_count() <= 1);
        }
        assert!(!c.select_all());
        assert!(c.selected_count() <= 1);
    }
}

#[test]
fn test_repeated_select_is_idempotent() {
    init_tracing();
    let inbox = inbox(3);
    let mut c = controller(&inbox, SelectionOptions::default());
    let after = Arc::new(AtomicUsize::new(0));
    let after_clone = after.clone();
    c.after_select.connect(move |_| {
        after_clone.fetch_add(1, Ordering::SeqCst);
    });

    c.select(inbox.messages[1], SelectFlags::NONE);
    let before = c.selected_items().to_vec();
    assert_eq!(
        c.select(inbox.messages[1], SelectFlags::NONE),
        SelectOutcome::Unchanged
    );
    assert_eq!(c.selected_items(), before.as_slice());
    assert_eq!(c.primary(), Some(&inbox.messages[1]));
    assert_eq!(after.load(Ordering::SeqCst), 1);
}

fn count_after_select(c: &mut SelectionController<NodeId>) -> Arc<AtomicUsize> {
    let after = Arc::new(AtomicUsize::new(0));
    let after_clone = after.clone();
    c.after_select.connect(move |_| {
        after_clone.fetch_add(1, Ordering::SeqCst);
    });
    after
}

/// Resolver for a host that renders nothing.
struct Offscreen(Arc<ItemTree>);

impl NodeResolver<NodeId> for Offscreen {
    fn resolve_id(&self, id: &str) -> Option<NodeId> {
        self.0.resolve_id(id)
    }

    fn visual_for(&self, _item: &NodeId) -> Option<VisualId> {
        None
    }

    fn id_for_visual(&self, _visual: VisualId) -> Option<String> {
        None
    }

    fn display_value(&self, item: &NodeId) -> Option<String> {
        self.0.display_value(item)
    }
}

#[test]
fn test_repeated_select_is_idempotent_offscreen() {
    init_tracing();
    let inbox = inbox(3);
    let mut c = SelectionController::new(
        SelectionOptions::default().with_delayed_select(false),
        inbox.tree.clone(),
        Arc::new(Offscreen(inbox.tree.clone())),
    );
    let after = count_after_select(&mut c);

    for _ in 0..3 {
        c.select(inbox.messages[0], SelectFlags::NONE);
    }
    assert_eq!(c.selected_items(), &[inbox.messages[0]]);
    assert_eq!(after.load(Ordering::SeqCst), 1);
}

#[test]
fn test_plain_click_on_sole_survivor_of_ctrl_toggle() {
    init_tracing();
    let inbox = inbox(3);
    let [a, b] = [inbox.messages[0], inbox.messages[1]];
    let mut c = controller(&inbox, SelectionOptions::default());
    let after = count_after_select(&mut c);

    c.select(a, SelectFlags::NONE);
    c.select(b, SelectFlags::CTRL);
    c.select(a, SelectFlags::CTRL);
    assert_eq!(c.selected_items(), &[b]);
    assert_eq!(c.primary(), Some(&b));
    let fired = after.load(Ordering::SeqCst);

    assert_eq!(c.select(b, SelectFlags::NONE), SelectOutcome::Unchanged);
    assert_eq!(c.selected_items(), &[b]);
    assert_eq!(after.load(Ordering::SeqCst), fired);
}

#[test]
fn test_shift_range_is_path_independent() {
    init_tracing();
    let inbox = inbox(6);
    let m = &inbox.messages;

    let mut direct = controller(&inbox, SelectionOptions::default());
    direct.select(m[1], SelectFlags::NONE);
    direct.select(m[3], SelectFlags::SHIFT);

    let mut detour = controller(&inbox, SelectionOptions::default());
    detour.select(m[1], SelectFlags::NONE);
    detour.select(m[5], SelectFlags::SHIFT);
    detour.select(m[3], SelectFlags::SHIFT);

    let expected = [m[1], m[2], m[3]];
    assert_eq!(direct.selected_items(), &expected);
    assert_eq!(detour.selected_items(), &expected);
}

#[test]
fn test_ctrl_toggle_even_count_restores_state() {
    init_tracing();
    let inbox = inbox(4);
    let m = &inbox.messages;
    let mut c = controller(&inbox, SelectionOptions::default());
    c.select(m[0], SelectFlags::NONE);
    c.select(m[2], SelectFlags::CTRL);
    let initial: Vec<_> = c.selected_items().to_vec();

    c.select(m[2], SelectFlags::CTRL);
    assert!(!c.is_selected(&m[2]));
    c.select(m[2], SelectFlags::CTRL);
    assert!(c.is_selected(&m[2]));

    for _ in 0..4 {
        c.select(m[2], SelectFlags::CTRL);
    }
    let mut sorted_initial = initial.clone();
    let mut sorted_now = c.selected_items().to_vec();
    sorted_initial.sort();
    sorted_now.sort();
    assert_eq!(sorted_now, sorted_initial);
}

#[test]
fn test_buffered_select_replays_instead_of_new_target() {
    init_tracing();
    let tree = Arc::new(ItemTree::new());
    let root = tree.create_node("inbox", "Inbox");
    let x = tree.add_child(root, "itemX", "X").unwrap();
    tree.add_child(root, "itemY", "Y").unwrap();
    let mut c = SelectionController::new(
        SelectionOptions::default().with_delayed_select(false),
        tree.clone(),
        tree.clone(),
    );

    assert_eq!(c.select("itemX", SelectFlags::NONE), SelectOutcome::Buffered);
    assert!(c.selected_items().is_empty());

    tree.set_root(root);
    c.select("itemY", SelectFlags::NONE);
    assert_eq!(c.selected_items(), &[x]);
}

#[test]
fn test_removed_item_is_reconciled() {
    init_tracing();
    let inbox = inbox(3);
    let [a, b, c_item] = [inbox.messages[0], inbox.messages[1], inbox.messages[2]];
    let mut c = controller(&inbox, SelectionOptions::default());
    c.select(a, SelectFlags::NONE);
    c.select(c_item, SelectFlags::CTRL);
    c.select(b, SelectFlags::CTRL);
    assert_eq!(c.indicator(), Some(&b));

    inbox.tree.remove(b);
    c.check_selection(None);

    assert_eq!(c.selected_items(), &[a, c_item]);
    assert_eq!(c.indicator(), c.primary());
}

#[test]
fn test_value_follows_selection() {
    init_tracing();
    let inbox = inbox(3);
    inbox.tree.set_value(inbox.messages[2], Some("archived"));
    let mut c = controller(&inbox, SelectionOptions::default());
    let values = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let values_clone = values.clone();
    c.value_changed
        .connect(move |value| values_clone.lock().push(value.clone()));

    c.select(inbox.messages[2], SelectFlags::NONE);
    assert_eq!(c.value().unwrap(), Some("archived".to_string()));
    assert_eq!(*values.lock(), vec![Some("archived".to_string())]);

    assert!(c.set_value(Some("Message 0"), false).unwrap().succeeded());
    assert_eq!(c.primary(), Some(&inbox.messages[0]));
}

#[test]
fn test_remove_then_add_through_actions() {
    init_tracing();
    let inbox = inbox(3);
    let mut c = controller(&inbox, SelectionOptions::default())
        .with_actions(inbox.tree.clone(), None);
    c.select(inbox.messages[1], SelectFlags::NONE);

    assert!(c.remove(None).unwrap());
    assert!(!inbox.tree.children(inbox.root).contains(&inbox.messages[1]));
    c.check_selection(None);
    assert!(!c.is_selected(&inbox.messages[1]));

    let node = inbox.tree.create_node("m9", "Message 9");
    let outcome = c.add(Some(node), None, None).unwrap();
    assert_eq!(outcome, AddOutcome::Added(node));
    assert_eq!(c.primary(), Some(&node));
    assert_eq!(inbox.tree.children(inbox.root).last(), Some(&node));
}
