//! Walkability grid and A* pathfinder built from the obstacle field.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use glam::{Vec2, Vec3};
use serde::Deserialize;
use spell_arena_core::CellCoord;

use crate::obstacles::ObstacleField;
use crate::planar;

const CARDINAL_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

/// Tunables for the navigation grid.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Edge length of a grid cell in world units.
    pub cell_size: f32,
    /// Extra clearance around obstacles when sampling walkability.
    pub safety_margin: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            cell_size: 2.0,
            safety_margin: 0.8,
        }
    }
}

/// Uniform walkability grid covering the arena.
///
/// Cells are sampled at their centres against the obstacle field. The grid is
/// only refreshed by [`NavigationGrid::rebuild`]; callers compare
/// [`NavigationGrid::is_stale`] against the field's layout generation to decide
/// when a rebuild is due.
#[derive(Clone, Debug)]
pub struct NavigationGrid {
    config: NavigationConfig,
    origin: f32,
    width: u32,
    height: u32,
    walkable: Vec<bool>,
    built_for: Option<u64>,
    workspace: SearchWorkspace,
}

#[derive(Clone, Debug, Default)]
struct SearchWorkspace {
    g_scores: Vec<u32>,
    came_from: Vec<Option<usize>>,
    closed: Vec<bool>,
    open: BinaryHeap<Reverse<(u32, u32, usize)>>,
}

impl SearchWorkspace {
    fn prepare(&mut self, cell_count: usize) {
        self.g_scores.clear();
        self.g_scores.resize(cell_count, u32::MAX);
        self.came_from.clear();
        self.came_from.resize(cell_count, None);
        self.closed.clear();
        self.closed.resize(cell_count, false);
        self.open.clear();
    }
}

impl NavigationGrid {
    /// Creates a grid sized for the field and samples its walkability.
    #[must_use]
    pub fn build(config: NavigationConfig, field: &ObstacleField) -> Self {
        let arena = field.bounds().size();
        let cell_size = config.cell_size.max(0.1);
        let cells = (arena / cell_size).ceil().max(1.0) as u32;
        let mut grid = Self {
            config: NavigationConfig {
                cell_size,
                ..config
            },
            origin: -arena / 2.0,
            width: cells,
            height: cells,
            walkable: Vec::new(),
            built_for: None,
            workspace: SearchWorkspace::default(),
        };
        grid.rebuild(field);
        grid
    }

    /// Resamples every cell against the current obstacle field.
    pub fn rebuild(&mut self, field: &ObstacleField) {
        let cell_count = self.cell_count();
        self.walkable.clear();
        self.walkable.reserve(cell_count);
        for row in 0..self.height {
            for column in 0..self.width {
                let point = self.cell_center(CellCoord::new(column, row));
                self.walkable.push(!field.blocks(point, self.config.safety_margin));
            }
        }
        self.built_for = Some(field.layout_generation());
    }

    /// Reports whether the field changed since the last rebuild.
    #[must_use]
    pub fn is_stale(&self, field: &ObstacleField) -> bool {
        self.built_for != Some(field.layout_generation())
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Edge length of a cell.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.config.cell_size
    }

    /// Cell containing the world position, clamped to the grid.
    #[must_use]
    pub fn world_to_cell(&self, position: Vec3) -> CellCoord {
        let point = planar(position);
        let clamp = |value: f32, limit: u32| -> u32 {
            let index = ((value - self.origin) / self.config.cell_size).floor();
            index.clamp(0.0, limit.saturating_sub(1) as f32) as u32
        };
        CellCoord::new(clamp(point.x, self.width), clamp(point.y, self.height))
    }

    /// World-space centre of a cell at ground level.
    #[must_use]
    pub fn cell_to_world(&self, cell: CellCoord) -> Vec3 {
        let center = self.cell_center(cell);
        Vec3::new(center.x, 0.0, center.y)
    }

    fn cell_center(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(
            self.origin + (cell.column() as f32 + 0.5) * self.config.cell_size,
            self.origin + (cell.row() as f32 + 0.5) * self.config.cell_size,
        )
    }

    /// Reports whether a cell can be traversed.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.walkable.get(index).copied())
            .unwrap_or(false)
    }

    /// Reports whether the cell containing `position` can be traversed.
    #[must_use]
    pub fn is_position_walkable(&self, position: Vec3) -> bool {
        self.is_walkable(self.world_to_cell(position))
    }

    /// Overrides the walkability of a single cell until the next rebuild.
    pub fn set_walkable(&mut self, cell: CellCoord, walkable: bool) {
        if let Some(slot) = self.index(cell).and_then(|index| self.walkable.get_mut(index)) {
            *slot = walkable;
        }
    }

    /// Finds a smoothed path between two world positions.
    ///
    /// Returns `None` when either endpoint lies in a blocked cell or when no
    /// route connects them. The first waypoint is the centre of the start cell
    /// and the last is the centre of the goal cell.
    pub fn find_path(&mut self, start: Vec3, goal: Vec3) -> Option<Vec<Vec3>> {
        let start_cell = self.world_to_cell(start);
        let goal_cell = self.world_to_cell(goal);
        if !self.is_walkable(start_cell) || !self.is_walkable(goal_cell) {
            return None;
        }

        let cells = self.search(start_cell, goal_cell)?;
        let waypoints: Vec<Vec3> = cells.into_iter().map(|cell| self.cell_to_world(cell)).collect();
        Some(self.smooth(&waypoints))
    }

    fn search(&mut self, start: CellCoord, goal: CellCoord) -> Option<Vec<CellCoord>> {
        let cell_count = self.cell_count();
        let start_index = self.index(start)?;
        let goal_index = self.index(goal)?;
        let width = usize::try_from(self.width).ok()?;

        let mut workspace = std::mem::take(&mut self.workspace);
        workspace.prepare(cell_count);
        workspace.g_scores[start_index] = 0;
        let h = octile(start, goal);
        workspace.open.push(Reverse((h, h, start_index)));

        let mut found = false;
        while let Some(Reverse((_, _, current_index))) = workspace.open.pop() {
            if workspace.closed[current_index] {
                continue;
            }
            if current_index == goal_index {
                found = true;
                break;
            }
            workspace.closed[current_index] = true;

            let current = cell_at(width, current_index);
            let current_g = workspace.g_scores[current_index];
            for (neighbor, step) in self.neighbors(current) {
                let Some(neighbor_index) = self.index(neighbor) else {
                    continue;
                };
                if workspace.closed[neighbor_index] {
                    continue;
                }
                let tentative = current_g.saturating_add(step);
                if tentative >= workspace.g_scores[neighbor_index] {
                    continue;
                }
                workspace.g_scores[neighbor_index] = tentative;
                workspace.came_from[neighbor_index] = Some(current_index);
                let h = octile(neighbor, goal);
                workspace.open.push(Reverse((tentative.saturating_add(h), h, neighbor_index)));
            }
        }

        let path = if found {
            let mut cells = vec![goal];
            let mut cursor = goal_index;
            while let Some(previous) = workspace.came_from[cursor] {
                cells.push(cell_at(width, previous));
                cursor = previous;
            }
            cells.reverse();
            Some(cells)
        } else {
            None
        };

        self.workspace = workspace;
        path
    }

    /// Walkable neighbours of a cell paired with their step cost.
    ///
    /// Diagonals are only offered when both flanking cardinal cells are
    /// walkable so paths never clip a blocked corner.
    fn neighbors(&self, cell: CellCoord) -> impl Iterator<Item = (CellCoord, u32)> {
        let mut candidates = [None; 8];
        let mut count = 0;
        let column = i64::from(cell.column());
        let row = i64::from(cell.row());

        for (dc, dr) in [
            (0, -1),
            (1, 0),
            (0, 1),
            (-1, 0),
            (1, -1),
            (1, 1),
            (-1, 1),
            (-1, -1),
        ] {
            let Some(neighbor) = self.offset(column + dc, row + dr) else {
                continue;
            };
            if !self.is_walkable(neighbor) {
                continue;
            }
            let diagonal = dc != 0 && dr != 0;
            if diagonal {
                let flank_a = self.offset(column + dc, row);
                let flank_b = self.offset(column, row + dr);
                let open = |flank: Option<CellCoord>| flank.map_or(false, |c| self.is_walkable(c));
                if !open(flank_a) || !open(flank_b) {
                    continue;
                }
            }
            let cost = if diagonal { DIAGONAL_COST } else { CARDINAL_COST };
            candidates[count] = Some((neighbor, cost));
            count += 1;
        }

        candidates.into_iter().take(count).flatten()
    }

    fn offset(&self, column: i64, row: i64) -> Option<CellCoord> {
        let column = u32::try_from(column).ok()?;
        let row = u32::try_from(row).ok()?;
        (column < self.width && row < self.height).then(|| CellCoord::new(column, row))
    }

    /// Drops intermediate waypoints that the mover can skip in a straight line.
    #[must_use]
    pub fn smooth(&self, waypoints: &[Vec3]) -> Vec<Vec3> {
        if waypoints.len() <= 2 {
            return waypoints.to_vec();
        }

        let mut smoothed = vec![waypoints[0]];
        let mut anchor = 0;
        while anchor < waypoints.len() - 1 {
            let mut furthest = anchor + 1;
            for candidate in (anchor + 2..waypoints.len()).rev() {
                if self.has_line_of_sight(waypoints[anchor], waypoints[candidate]) {
                    furthest = candidate;
                    break;
                }
            }
            smoothed.push(waypoints[furthest]);
            anchor = furthest;
        }
        smoothed
    }

    /// Samples the segment at cell-size steps and checks each sample is walkable.
    #[must_use]
    pub fn has_line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        let start = planar(from);
        let end = planar(to);
        let distance = start.distance(end);
        let steps = (distance / self.config.cell_size).ceil().max(1.0) as u32;
        (0..=steps).all(|step| {
            let t = step as f32 / steps as f32;
            let point = start.lerp(end, t);
            self.is_position_walkable(Vec3::new(point.x, 0.0, point.y))
        })
    }

    fn cell_count(&self) -> usize {
        let width = usize::try_from(self.width).unwrap_or(0);
        let height = usize::try_from(self.height).unwrap_or(0);
        width.checked_mul(height).unwrap_or(0)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.width || cell.row() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

fn cell_at(width: usize, index: usize) -> CellCoord {
    let column = u32::try_from(index % width).unwrap_or(u32::MAX);
    let row = u32::try_from(index / width).unwrap_or(u32::MAX);
    CellCoord::new(column, row)
}

/// Octile distance in step-cost units; admissible for 10/14 step costs.
fn octile(from: CellCoord, to: CellCoord) -> u32 {
    let dx = from.column().abs_diff(to.column());
    let dy = from.row().abs_diff(to.row());
    let (low, high) = if dx < dy { (dx, dy) } else { (dy, dx) };
    CARDINAL_COST * high + (DIAGONAL_COST - CARDINAL_COST) * low
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacles::{Obstacle, ObstacleConfig};
    use spell_arena_core::{ObstacleId, Timestamp};

    fn open_field() -> ObstacleField {
        ObstacleField::from_obstacles(ObstacleConfig::empty(40.0), 0, Vec::new(), Timestamp::ZERO)
    }

    fn path_length(path: &[Vec3]) -> f32 {
        path.windows(2).map(|pair| pair[0].distance(pair[1])).sum()
    }

    #[test]
    fn open_grid_paths_are_visible_and_near_straight() {
        let field = open_field();
        let mut grid = NavigationGrid::build(NavigationConfig::default(), &field);
        let start = Vec3::new(-17.0, 0.0, -15.0);
        let goal = Vec3::new(15.0, 0.0, 9.0);

        let path = grid.find_path(start, goal).expect("open grid path");

        assert!(path.len() >= 2);
        for pair in path.windows(2) {
            assert!(grid.has_line_of_sight(pair[0], pair[1]));
        }
        let straight = path[0].distance(*path.last().expect("goal waypoint"));
        assert!(path_length(&path) <= straight * 1.1 + grid.cell_size());
    }

    #[test]
    fn blocked_endpoints_return_none() {
        let field = open_field();
        let mut grid = NavigationGrid::build(NavigationConfig::default(), &field);
        let goal = Vec3::new(10.0, 0.0, 10.0);
        let goal_cell = grid.world_to_cell(goal);

        grid.set_walkable(goal_cell, false);

        assert!(grid.find_path(Vec3::ZERO, goal).is_none());
        assert!(grid.find_path(goal, Vec3::ZERO).is_none());
    }

    #[test]
    fn wall_forces_a_detour() {
        let wall = Obstacle::hedge(
            ObstacleId::new(0),
            Vec2::new(0.0, 0.0),
            Vec2::new(0.4, 14.0),
            3.5,
            true,
        );
        let field = ObstacleField::from_obstacles(
            ObstacleConfig::empty(40.0),
            0,
            vec![wall],
            Timestamp::ZERO,
        );
        let mut grid = NavigationGrid::build(NavigationConfig::default(), &field);
        let start = Vec3::new(-8.0, 0.0, 0.0);
        let goal = Vec3::new(8.0, 0.0, 0.0);

        assert!(!grid.has_line_of_sight(start, goal));
        let path = grid.find_path(start, goal).expect("detour");

        assert!(path.len() >= 3);
        for pair in path.windows(2) {
            assert!(grid.has_line_of_sight(pair[0], pair[1]));
        }
        assert!(path_length(&path) > start.distance(goal));
    }

    #[test]
    fn enclosed_goal_is_unreachable() {
        let field = open_field();
        let mut grid = NavigationGrid::build(NavigationConfig::default(), &field);
        let goal = CellCoord::new(10, 10);
        for column in 9..=11 {
            for row in 9..=11 {
                if column != 10 || row != 10 {
                    grid.set_walkable(CellCoord::new(column, row), false);
                }
            }
        }

        assert!(grid
            .find_path(Vec3::new(-15.0, 0.0, -15.0), grid.cell_to_world(goal))
            .is_none());
    }

    #[test]
    fn diagonals_do_not_cut_corners() {
        let field = open_field();
        let mut grid = NavigationGrid::build(NavigationConfig::default(), &field);
        grid.set_walkable(CellCoord::new(6, 5), false);

        let moves: Vec<CellCoord> = grid
            .neighbors(CellCoord::new(5, 5))
            .map(|(cell, _)| cell)
            .collect();

        assert!(!moves.contains(&CellCoord::new(6, 4)));
        assert!(!moves.contains(&CellCoord::new(6, 6)));
        assert!(moves.contains(&CellCoord::new(4, 4)));
        assert_eq!(moves.len(), 5);
    }

    #[test]
    fn staleness_tracks_layout_generation() {
        let hedge = Obstacle::hedge(
            ObstacleId::new(0),
            Vec2::new(0.0, 5.0),
            Vec2::new(4.0, 0.4),
            3.5,
            false,
        );
        let mut field = ObstacleField::from_obstacles(
            ObstacleConfig::empty(40.0),
            0,
            vec![hedge],
            Timestamp::ZERO,
        );
        let mut grid = NavigationGrid::build(NavigationConfig::default(), &field);
        let point = Vec3::new(0.0, 0.0, 5.0);
        assert!(grid.is_position_walkable(point));

        assert!(field.toggle_hedge(ObstacleId::new(0), Timestamp::ZERO));
        assert!(grid.is_stale(&field));

        grid.rebuild(&field);
        assert!(!grid.is_stale(&field));
        assert!(!grid.is_position_walkable(point));
    }

    #[test]
    fn world_to_cell_clamps_outside_positions() {
        let field = open_field();
        let grid = NavigationGrid::build(NavigationConfig::default(), &field);
        assert_eq!(grid.world_to_cell(Vec3::new(-500.0, 0.0, 500.0)), CellCoord::new(0, 19));
        assert_eq!(grid.world_to_cell(Vec3::new(0.1, 0.0, 0.1)), CellCoord::new(10, 10));
    }
}
