/// Mints stable string ids with a fixed prefix (`npc_17`, `proj_42`).
/// Each map owns its own allocators, so ids are unique per map for the
/// lifetime of the process.
#[derive(Debug)]
pub struct IdAllocator {
    prefix: &'static str,
    next: u64,
}

impl IdAllocator {
    pub const fn new(prefix: &'static str) -> Self {
        Self { prefix, next: 0 }
    }

    pub fn next(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        format!("{}_{}", self.prefix, id)
    }
}
