//! Fixed spatial partitioning used to bound proximity and contact searches.
//!
//! The grid owns one [`Cell`] per square partition of the world. Cells keep
//! arena indices of the agents registered in them, split by role, plus the
//! per-rate frame counters that throttle expensive per-agent work.

use glam::Vec2;
use tailchase_core::{AgentId, CellId, Role};

/// Membership lists of a single cell, split by role.
#[derive(Clone, Debug, Default)]
pub(crate) struct CellMembers {
    controlled: Vec<AgentId>,
    friends: Vec<AgentId>,
    foes: Vec<AgentId>,
}

impl CellMembers {
    /// Agents of the provided role registered in the cell, in insertion order.
    pub(crate) fn list(&self, role: Role) -> &[AgentId] {
        match role {
            Role::Controlled => &self.controlled,
            Role::Friend => &self.friends,
            Role::Foe => &self.foes,
        }
    }

    fn list_mut(&mut self, role: Role) -> &mut Vec<AgentId> {
        match role {
            Role::Controlled => &mut self.controlled,
            Role::Friend => &mut self.friends,
            Role::Foe => &mut self.foes,
        }
    }

    /// Adds the agent to the role list. Re-adding is a no-op.
    fn insert(&mut self, role: Role, agent: AgentId) -> bool {
        let list = self.list_mut(role);
        if list.contains(&agent) {
            return false;
        }
        list.push(agent);
        true
    }

    fn remove(&mut self, role: Role, agent: AgentId) -> bool {
        let list = self.list_mut(role);
        match list.iter().position(|member| *member == agent) {
            Some(index) => {
                let _ = list.remove(index);
                true
            }
            None => false,
        }
    }

    fn is_empty(&self) -> bool {
        self.controlled.is_empty() && self.friends.is_empty() && self.foes.is_empty()
    }

    /// Appends every member to `out`: controlled entity first, then friends, then foes.
    pub(crate) fn collect_into(&self, out: &mut Vec<AgentId>) {
        out.extend_from_slice(&self.controlled);
        out.extend_from_slice(&self.friends);
        out.extend_from_slice(&self.foes);
    }
}

#[derive(Clone, Copy, Debug)]
struct RateCounter {
    rate: u32,
    origin: u64,
}

/// Independent throttling counters, one per subscribed rate.
///
/// A counter is created the first time a rate is queried and fires on that
/// frame and every `rate` frames afterwards.
#[derive(Clone, Debug, Default)]
struct FrameCounters {
    counters: Vec<RateCounter>,
}

impl FrameCounters {
    fn admits(&mut self, rate: u32, frame: u64) -> bool {
        let rate = rate.max(1);
        let origin = match self.counters.iter().find(|counter| counter.rate == rate) {
            Some(counter) => counter.origin,
            None => {
                self.counters.push(RateCounter {
                    rate,
                    origin: frame,
                });
                frame
            }
        };
        frame.saturating_sub(origin) % u64::from(rate) == 0
    }
}

/// Single square partition of the world.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    members: CellMembers,
    frame: u64,
    counters: FrameCounters,
    update_rate: f32,
}

impl Cell {
    fn new() -> Self {
        Self {
            members: CellMembers::default(),
            frame: 0,
            counters: FrameCounters::default(),
            update_rate: 1.0,
        }
    }

    /// Membership lists of the cell.
    pub(crate) fn members(&self) -> &CellMembers {
        &self.members
    }

    /// Displacement multiplier compensating for skipped frames of this cell.
    pub(crate) fn update_rate(&self) -> f32 {
        self.update_rate
    }

    /// Reports whether an operation throttled to `rate` runs on the cell's
    /// current frame. Stable for the whole frame.
    pub(crate) fn frames_between_updates(&mut self, rate: u32) -> bool {
        self.counters.admits(rate, self.frame)
    }
}

/// Grid-facing state an agent carries to stay in sync with the cells.
#[derive(Clone, Debug, Default)]
pub(crate) struct Membership {
    primary: Option<CellId>,
    active_cells: Vec<CellId>,
    surrounding_cells: Vec<CellId>,
    cell_edge_distance: f32,
}

impl Membership {
    /// Cell containing the agent's centre as of the last recheck.
    pub(crate) fn primary_cell(&self) -> Option<CellId> {
        self.primary
    }

    /// Cells the agent is registered in, primary cell first.
    pub(crate) fn active_cells(&self) -> &[CellId] {
        &self.active_cells
    }

    /// Primary cell and its neighbours, scanned by proximity queries.
    pub(crate) fn surrounding_cells(&self) -> &[CellId] {
        &self.surrounding_cells
    }

    /// Counts down the distance left before membership must be rechecked.
    pub(crate) fn consume_edge_distance(&mut self, travelled: f32) {
        self.cell_edge_distance -= travelled;
    }

    /// Forces a recheck on the next admitted membership update.
    pub(crate) fn invalidate(&mut self) {
        self.cell_edge_distance = 0.0;
    }
}

/// Fixed grid of cells covering the whole world.
#[derive(Clone, Debug)]
pub(crate) struct Grid {
    columns: u32,
    rows: u32,
    cell_size: f32,
    cells: Vec<Cell>,
    covered_scratch: Vec<CellId>,
}

impl Grid {
    /// Partitions a `width` x `height` world into square cells.
    pub(crate) fn new(width: f32, height: f32, cell_size: f32) -> Self {
        let columns = (width / cell_size).ceil().max(1.0) as u32;
        let rows = (height / cell_size).ceil().max(1.0) as u32;
        let count = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            rows,
            cell_size,
            cells: vec![Cell::new(); count],
            covered_scratch: Vec::new(),
        }
    }

    /// Number of cells along each axis.
    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    pub(crate) fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(index(id))
    }

    pub(crate) fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.get_mut(index(id))
    }

    /// Cell containing the provided point. Points outside the world map to the
    /// nearest border cell.
    pub(crate) fn cell_at(&self, point: Vec2) -> CellId {
        let column = self.axis_index(point.x, self.columns);
        let row = self.axis_index(point.y, self.rows);
        self.id(column, row)
    }

    fn axis_index(&self, value: f32, count: u32) -> u32 {
        let raw = (value / self.cell_size).floor();
        if raw <= 0.0 {
            0
        } else {
            (raw as u32).min(count.saturating_sub(1))
        }
    }

    fn id(&self, column: u32, row: u32) -> CellId {
        CellId::new(row * self.columns + column)
    }

    fn coords(&self, id: CellId) -> (u32, u32) {
        (id.get() % self.columns, id.get() / self.columns)
    }

    /// Selects the cells updated this tick and advances their frames.
    ///
    /// Only cells with members are considered. Cells within `near_radius` of
    /// `focus` update every tick; the rest update every `far_cadence` ticks and
    /// carry a matching update rate so displacement per second is preserved.
    pub(crate) fn plan_frame(
        &mut self,
        focus: Option<CellId>,
        near_radius: u32,
        far_cadence: u32,
        tick: u64,
        out: &mut Vec<CellId>,
    ) {
        out.clear();
        let columns = self.columns;
        let focus = focus.map(|id| self.coords(id));
        let far_cadence = far_cadence.max(1);

        for (offset, cell) in self.cells.iter_mut().enumerate() {
            if cell.members.is_empty() {
                continue;
            }

            let id = CellId::new(offset as u32);
            let column = id.get() % columns;
            let row = id.get() / columns;
            let cadence = match focus {
                Some((focus_column, focus_row))
                    if column.abs_diff(focus_column).max(row.abs_diff(focus_row))
                        > near_radius =>
                {
                    far_cadence
                }
                _ => 1,
            };

            cell.update_rate = cadence as f32;
            if tick % u64::from(cadence) == 0 {
                cell.frame += 1;
                out.push(id);
            }
        }
    }

    /// Registers the agent into the cells its bounds overlap.
    ///
    /// The full recheck only runs when the agent has no cells yet or has used
    /// up its edge distance; otherwise the call is a no-op. Returns whether the
    /// membership was recomputed.
    pub(crate) fn register(
        &mut self,
        membership: &mut Membership,
        role: Role,
        agent: AgentId,
        position: Vec2,
        half_extent: Vec2,
    ) -> bool {
        if membership.primary.is_some() && membership.cell_edge_distance > 0.0 {
            return false;
        }

        let primary = self.cell_at(position);
        let mut covered = std::mem::take(&mut self.covered_scratch);
        covered.clear();
        self.collect_covered(primary, position, half_extent, &mut covered);

        for stale in membership
            .active_cells
            .iter()
            .filter(|cell| !covered.contains(cell))
        {
            if let Some(cell) = self.cells.get_mut(index(*stale)) {
                let _ = cell.members.remove(role, agent);
            }
        }
        for cell_id in &covered {
            if let Some(cell) = self.cells.get_mut(index(*cell_id)) {
                let _ = cell.members.insert(role, agent);
            }
        }

        membership.active_cells.clear();
        membership.active_cells.extend_from_slice(&covered);
        membership.surrounding_cells.clear();
        self.collect_surrounding(primary, &mut membership.surrounding_cells);
        membership.primary = Some(primary);
        membership.cell_edge_distance = self.edge_clearance(primary, position);
        self.covered_scratch = covered;

        log::trace!(
            "agent {} registered in {} cells around {:?}",
            agent.get(),
            membership.active_cells.len(),
            primary
        );
        true
    }

    /// Removes the agent from every cell it is registered in.
    pub(crate) fn unregister(&mut self, membership: &mut Membership, role: Role, agent: AgentId) {
        for cell_id in membership.active_cells.drain(..) {
            if let Some(cell) = self.cells.get_mut(index(cell_id)) {
                let _ = cell.members.remove(role, agent);
            }
        }
        membership.surrounding_cells.clear();
        membership.primary = None;
        membership.cell_edge_distance = 0.0;
    }

    fn collect_covered(&self, primary: CellId, center: Vec2, half: Vec2, out: &mut Vec<CellId>) {
        out.push(primary);
        let min = self.cell_at(center - half);
        let max = self.cell_at(center + half);
        let (min_column, min_row) = self.coords(min);
        let (max_column, max_row) = self.coords(max);
        for row in min_row..=max_row {
            for column in min_column..=max_column {
                let id = self.id(column, row);
                if id != primary {
                    out.push(id);
                }
            }
        }
    }

    fn collect_surrounding(&self, primary: CellId, out: &mut Vec<CellId>) {
        let (column, row) = self.coords(primary);
        let first_row = row.saturating_sub(1);
        let last_row = (row + 1).min(self.rows - 1);
        let first_column = column.saturating_sub(1);
        let last_column = (column + 1).min(self.columns - 1);
        for row in first_row..=last_row {
            for column in first_column..=last_column {
                out.push(self.id(column, row));
            }
        }
    }

    fn edge_clearance(&self, cell: CellId, position: Vec2) -> f32 {
        let (column, row) = self.coords(cell);
        let origin = Vec2::new(column as f32, row as f32) * self.cell_size;
        let far = origin + Vec2::splat(self.cell_size);
        let clearance = (position.x - origin.x)
            .min(far.x - position.x)
            .min(position.y - origin.y)
            .min(far.y - position.y);
        clearance.max(0.0)
    }
}

fn index(id: CellId) -> usize {
    id.get() as usize
}
