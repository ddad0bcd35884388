use super::geometry::{Rect, Vec2};
use super::terrain::{Terrain, TerrainKind};

pub const FALLBACK_WORLD_WIDTH: f32 = 1920.0;
pub const FALLBACK_WORLD_HEIGHT: f32 = 4320.0;

/// Static layout a session is built from. Terrain here is the pristine, never-stepped copy.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelData {
    pub world_width: f32,
    pub world_height: f32,
    pub spawn: Vec2,
    pub terrain: Vec<Terrain>,
    /// SHA-256 of the source file, when the level came from disk.
    pub source_sha256_hex: Option<String>,
}

impl LevelData {
    /// One oversized platform at the bottom edge so the actor cannot fall through an empty world.
    pub fn fallback() -> Self {
        Self::safety_net(FALLBACK_WORLD_WIDTH, FALLBACK_WORLD_HEIGHT)
    }

    pub fn safety_net(world_width: f32, world_height: f32) -> Self {
        let platform = Terrain::new(
            Rect::new(-2000.0, world_height - 20.0, world_width + 4000.0, 200.0),
            TerrainKind::Static,
        );
        Self {
            world_width,
            world_height,
            spawn: Vec2::new(world_width * 0.5, world_height - 200.0),
            terrain: vec![platform],
            source_sha256_hex: None,
        }
    }

    /// Spawn point centered horizontally, standing above the lowest terrain piece.
    pub fn derive_spawn(
        world_width: f32,
        world_height: f32,
        terrain: &[Terrain],
        actor_size: Vec2,
    ) -> Vec2 {
        let lowest = terrain
            .iter()
            .filter(|piece| piece.is_solid())
            .max_by(|a, b| a.rect.top().total_cmp(&b.rect.top()));
        match lowest {
            Some(piece) => {
                let center_x = piece.rect.center().x.clamp(0.0, world_width.max(0.0));
                Vec2::new(
                    center_x - actor_size.x * 0.5,
                    piece.rect.top() - actor_size.y - 1.0,
                )
            }
            None => Vec2::new(world_width * 0.5, world_height - 200.0),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.world_width.is_finite()
            && self.world_height.is_finite()
            && self.world_width > 0.0
            && self.world_height > 0.0
            && !self.terrain.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_platform_spans_the_world_bottom() {
        let level = LevelData::fallback();
        assert!(level.is_usable());
        assert_eq!(level.terrain.len(), 1);
        let platform = level.terrain[0].rect;
        assert!(platform.left() < 0.0);
        assert!(platform.right() > level.world_width);
        assert!(platform.top() < level.world_height);
        assert!(level.spawn.y + 30.0 < platform.top());
    }

    #[test]
    fn derived_spawn_stands_above_lowest_piece() {
        let terrain = vec![
            Terrain::new(Rect::new(0.0, 300.0, 100.0, 20.0), TerrainKind::Static),
            Terrain::new(Rect::new(400.0, 900.0, 200.0, 20.0), TerrainKind::Static),
        ];
        let spawn = LevelData::derive_spawn(1000.0, 1000.0, &terrain, Vec2::new(20.0, 30.0));
        assert_eq!(spawn, Vec2::new(490.0, 869.0));
    }
}
