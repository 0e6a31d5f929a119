//! Slab-arena doubly linked list of `(row, col)` coordinate nodes.
//!
//! The reference implementation is a conventional doubly linked list built from
//! individually `malloc`'d nodes; `MoveNode(src, dst, node)` is always a fresh
//! `AppendNode` into `dst` followed by a `RemoveNode` from `src` — it never
//! mutates a node in place. This crate keeps that exact discipline but stores
//! nodes in a slab (`NodeArena`) addressed by a small integer handle instead of
//! raw pointers, which needs no `unsafe` and amortizes allocation. `move_node`
//! frees the old slot and allocates a new one, so a handle captured by an outer
//! loop before a move is never silently repointed underneath it.

pub type Handle = u32;

#[derive(Clone, Copy)]
struct Slot {
  row: i16,
  col: i16,
  next: Option<Handle>,
  prev: Option<Handle>,
}

/// Backing storage for every node across all of a session's node lists.
pub struct NodeArena {
  slots: Vec<Slot>,
  free: Vec<Handle>,
}

impl NodeArena {
  pub fn new() -> Self {
    Self { slots: Vec::new(), free: Vec::new() }
  }

  fn alloc(&mut self, row: i16, col: i16) -> Handle {
    let slot = Slot { row, col, next: None, prev: None };
    if let Some(h) = self.free.pop() {
      self.slots[h as usize] = slot;
      h
    } else {
      self.slots.push(slot);
      (self.slots.len() - 1) as Handle
    }
  }

  pub fn row(&self, h: Handle) -> i16 {
    self.slots[h as usize].row
  }

  pub fn col(&self, h: Handle) -> i16 {
    self.slots[h as usize].col
  }

  pub fn next(&self, h: Handle) -> Option<Handle> {
    self.slots[h as usize].next
  }

  /// Overwrite `h`'s coordinates in place, e.g. `ChangeNodeType`'s sign
  /// negation ahead of a same-list [`NodeList::requeue`].
  pub fn set_coords(&mut self, h: Handle, row: i16, col: i16) {
    self.slots[h as usize].row = row;
    self.slots[h as usize].col = col;
  }
}

/// One ordered list (LIP, LSP, or LIS) of handles into a shared [`NodeArena`].
#[derive(Default)]
pub struct NodeList {
  head: Option<Handle>,
  tail: Option<Handle>,
}

impl NodeList {
  pub fn new() -> Self {
    Self { head: None, tail: None }
  }

  pub fn head(&self) -> Option<Handle> {
    self.head
  }

  pub fn append(&mut self, arena: &mut NodeArena, row: i16, col: i16) -> Handle {
    let h = arena.alloc(row, col);
    arena.slots[h as usize].prev = self.tail;
    arena.slots[h as usize].next = None;

    if let Some(t) = self.tail {
      arena.slots[t as usize].next = Some(h);
    } else {
      self.head = Some(h);
    }
    self.tail = Some(h);

    h
  }

  pub fn remove(&mut self, arena: &mut NodeArena, h: Handle) {
    let (prev, next) = {
      let slot = arena.slots[h as usize];
      (slot.prev, slot.next)
    };

    match prev {
      Some(p) => arena.slots[p as usize].next = next,
      None => self.head = next,
    }
    match next {
      Some(n) => arena.slots[n as usize].prev = prev,
      None => self.tail = prev,
    }

    arena.free.push(h);
  }

  /// Remove `h` from this list (as `src`) and append a fresh copy of its
  /// coordinates to `dst`, returning the new handle. When `src` and `dst` are
  /// the same list this re-appends the node at the tail — the idiom SPIHT uses
  /// to mark a type-A LIS entry as type-B while keeping it in the pass's
  /// remaining traversal.
  pub fn move_node(&mut self, dst: &mut NodeList, arena: &mut NodeArena, h: Handle) -> Handle {
    let (row, col) = (arena.row(h), arena.col(h));
    self.remove(arena, h);
    dst.append(arena, row, col)
  }

  /// `move_node(self, self, h)` without the double-borrow: free `h` and
  /// re-append its coordinates at this same list's tail.
  pub fn requeue(&mut self, arena: &mut NodeArena, h: Handle) -> Handle {
    let (row, col) = (arena.row(h), arena.col(h));
    self.remove(arena, h);
    self.append(arena, row, col)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn append_and_iterate_preserves_order() {
    let mut arena = NodeArena::new();
    let mut list = NodeList::new();

    list.append(&mut arena, 0, 0);
    list.append(&mut arena, 1, 2);
    list.append(&mut arena, 3, 4);

    let mut seen = Vec::new();
    let mut cur = list.head();
    while let Some(h) = cur {
      seen.push((arena.row(h), arena.col(h)));
      cur = arena.next(h);
    }

    assert_eq!(seen, vec![(0, 0), (1, 2), (3, 4)]);
  }

  #[test]
  fn remove_mid_list_relinks_neighbors() {
    let mut arena = NodeArena::new();
    let mut list = NodeList::new();

    let a = list.append(&mut arena, 0, 0);
    let b = list.append(&mut arena, 1, 1);
    let c = list.append(&mut arena, 2, 2);

    list.remove(&mut arena, b);

    assert_eq!(arena.next(a), Some(c));
    assert_eq!(list.head(), Some(a));

    list.remove(&mut arena, c);
    assert_eq!(arena.next(a), None);
    list.remove(&mut arena, a);
    assert_eq!(list.head(), None);
  }

  #[test]
  fn captured_next_survives_move_of_current_node() {
    // Mirrors the SPIHT pass idiom: capture `next` before mutating the node
    // the cursor is currently on, then move (not mutate) that node elsewhere.
    let mut arena = NodeArena::new();
    let mut lis = NodeList::new();
    let mut lsp = NodeList::new();

    let a = lis.append(&mut arena, 0, 0);
    let b = lis.append(&mut arena, 1, 1);

    let cur = a;
    let next = arena.next(cur); // captured before the move, as the outer loop does

    lis.move_node(&mut lsp, &mut arena, cur);

    assert_eq!(next, Some(b));
    assert_eq!(arena.next(next.unwrap()), None);
  }

  #[test]
  fn requeue_moves_node_to_tail_of_same_list() {
    let mut arena = NodeArena::new();
    let mut lis = NodeList::new();

    let a = lis.append(&mut arena, 5, 6);
    let b = lis.append(&mut arena, 7, 8);

    lis.requeue(&mut arena, a);

    // a was freed and re-appended; b is now the head, and the new handle for
    // a's coordinates sits at the tail.
    assert_eq!(lis.head(), Some(b));
    let tail_handle = arena.next(b).unwrap();
    assert_eq!((arena.row(tail_handle), arena.col(tail_handle)), (5, 6));
  }
}
