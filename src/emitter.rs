//! The code emitter: label-counter allocation plus textual assembly
//! accumulation (SPEC_FULL.md §4.7). The monotonic-counter-and-`writeln!`-
//! into-a-buffer shape is grounded on the pack's `CodeGen::fresh_temp`/
//! `fresh_block` pattern (a sibling example crate's virtual-stack emitter);
//! this crate's fragments are built and returned by value per reduction
//! (SPEC_FULL.md §4.2) rather than written into one shared buffer, so
//! `Emitter` here is purely the counter allocator, and fragment
//! concatenation happens in `compiler.rs`.

/// Loop discriminant used to validate `break`/`continue` and to reject
/// `continue` inside `do`-`while` (SPEC_FULL.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    For,
    While,
    Do,
}

#[derive(Default)]
pub struct Emitter {
    if_count: u32,
    rel_if_count: u32,
    loop_count: u32,
    match_count: u32,
    rel_match_count: u32,
    /// Active loops, innermost last, paired with the `loop_count` value
    /// allocated when that loop was entered (so `break`/`continue` inside a
    /// nested loop target the *innermost* loop's labels, not whichever
    /// loop most recently bumped the shared counter).
    pub loop_stack: Vec<(LoopKind, u32)>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh `if_count`, returning it; `rel` should be supplied
    /// by the caller for the first arm of a chain and reused for every
    /// `else if`/`else` in that same chain so they share one
    /// `FINISHIF{rel}` terminator (SPEC_FULL.md §4.6, §4.8).
    pub fn next_if(&mut self) -> u32 {
        self.if_count += 1;
        self.if_count
    }

    pub fn next_rel_if(&mut self) -> u32 {
        self.rel_if_count += 1;
        self.rel_if_count
    }

    pub fn next_loop(&mut self) -> u32 {
        self.loop_count += 1;
        self.loop_count
    }

    pub fn next_match(&mut self) -> u32 {
        self.match_count += 1;
        self.match_count
    }

    pub fn next_rel_match(&mut self) -> u32 {
        self.rel_match_count += 1;
        self.rel_match_count
    }

    pub fn enter_loop(&mut self, kind: LoopKind, k: u32) {
        self.loop_stack.push((kind, k));
    }

    pub fn exit_loop(&mut self) {
        self.loop_stack.pop();
    }

    pub fn innermost_loop(&self) -> Option<LoopKind> {
        self.loop_stack.last().map(|(kind, _)| *kind)
    }

    /// The `k` of the innermost active loop, for `break`/`continue` label
    /// targets (SPEC_FULL.md §4.6 "Break / continue").
    pub fn innermost_loop_k(&self) -> Option<u32> {
        self.loop_stack.last().map(|(_, k)| *k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn if_counters_are_monotonic() {
        let mut e = Emitter::new();
        assert_eq!(e.next_if(), 1);
        assert_eq!(e.next_if(), 2);
    }

    #[test]
    fn loop_stack_rejects_continue_in_do() {
        let mut e = Emitter::new();
        e.enter_loop(LoopKind::Do, 1);
        assert_eq!(e.innermost_loop(), Some(LoopKind::Do));
    }

    #[test]
    fn nested_loops_keep_distinct_k() {
        let mut e = Emitter::new();
        let outer = e.next_loop();
        e.enter_loop(LoopKind::While, outer);
        let inner = e.next_loop();
        e.enter_loop(LoopKind::For, inner);
        assert_eq!(e.innermost_loop_k(), Some(inner));
        e.exit_loop();
        assert_eq!(e.innermost_loop_k(), Some(outer));
    }
}
