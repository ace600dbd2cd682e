use stardrift_core::math::Vector2;

/// Loot container spawned where an NPC died. Until `exclusive_until`
/// only the killer may collect it; it despawns at `expires_at`.
pub struct CargoBox {
    pub id: String,
    pub pos: Vector2,
    pub resource_type: String,
    pub quantity: i64,
    pub npc_type: String,
    pub killer_id: Option<u64>,
    pub spawned_at: u64,
    pub expires_at: u64,
    pub exclusive_until: u64,
}

impl CargoBox {
    pub fn expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn exclusive_to_other(&self, client_id: u64, now: u64) -> bool {
        now < self.exclusive_until && self.killer_id.is_some() && self.killer_id != Some(client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_box() -> CargoBox {
        CargoBox {
            id: "box_0".to_string(),
            pos: Vector2::new(100.0, 100.0),
            resource_type: "prometium".to_string(),
            quantity: 4,
            npc_type: "Scouter".to_string(),
            killer_id: Some(1),
            spawned_at: 1_000,
            expires_at: 61_000,
            exclusive_until: 11_000,
        }
    }

    #[test]
    fn killer_is_never_locked_out() {
        let cargo = sample_box();
        assert!(!cargo.exclusive_to_other(1, 5_000));
    }

    #[test]
    fn others_wait_for_the_window() {
        let cargo = sample_box();
        assert!(cargo.exclusive_to_other(2, 10_999));
        assert!(!cargo.exclusive_to_other(2, 11_000));
    }

    #[test]
    fn unowned_boxes_are_open() {
        let mut cargo = sample_box();
        cargo.killer_id = None;
        assert!(!cargo.exclusive_to_other(2, 5_000));
    }
}
