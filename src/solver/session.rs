//! Kasuari (Cassowary) session for one constraint solve
//!
//! Translates layout constraints into the solver's linear form and
//! extracts positions afterwards. Disjunctive no-overlap is handled by
//! ranking the four separation orderings against the seed placement and
//! adding the best one the solver accepts. Locked nodes get pinned
//! variables, so a constraint that fights an upstream position surfaces
//! as an ordinary unsatisfiable addition.

use std::collections::HashMap;

use kasuari::{
    AddConstraintError, Expression, Solver as KasuariSolver, Strength, Variable as KasuariVariable,
    WeightedRelation::*,
};
use log::{debug, trace};

use crate::geometry::{BoundingBox, Point};
use crate::planner::{Axis, ConstraintKind, LayoutConstraint, NodeDimensions};

/// A variable in the constraint system: one coordinate of one node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VarKey {
    node: String,
    axis: Axis,
}

impl VarKey {
    fn x(node: &str) -> Self {
        Self {
            node: node.to_string(),
            axis: Axis::X,
        }
    }

    fn y(node: &str) -> Self {
        Self {
            node: node.to_string(),
            axis: Axis::Y,
        }
    }
}

/// Why a constraint addition was rejected
#[derive(Debug)]
pub(crate) enum AddFailure {
    /// Jointly unsatisfiable with what is already accumulated
    Unsatisfiable { detail: String },
    /// Solver-internal fault
    Internal(String),
}

pub(crate) struct ConstraintSession<'a> {
    solver: KasuariSolver,
    vars: HashMap<VarKey, KasuariVariable>,
    /// Seed rectangles guiding disjunct choice and anchoring free nodes
    seeds: &'a HashMap<String, BoundingBox>,
    dims: &'a NodeDimensions,
    /// Last known value per variable, initialized from the seeds
    values: HashMap<VarKey, f64>,
}

impl<'a> ConstraintSession<'a> {
    /// Set up variables for every seeded node. Free nodes are anchored to
    /// their seed through edit variables; locked nodes are pinned hard.
    pub(crate) fn new(
        seeds: &'a HashMap<String, BoundingBox>,
        dims: &'a NodeDimensions,
        locked: &HashMap<String, Point>,
    ) -> Result<Self, AddFailure> {
        let mut session = Self {
            solver: KasuariSolver::new(),
            vars: HashMap::new(),
            seeds,
            dims,
            values: HashMap::new(),
        };

        let mut nodes: Vec<&String> = seeds.keys().collect();
        nodes.sort();
        for node in nodes {
            let x = session.var(VarKey::x(node));
            let y = session.var(VarKey::y(node));
            if let Some(pin) = locked.get(node) {
                session.pin(x, pin.x)?;
                session.pin(y, pin.y)?;
                session.values.insert(VarKey::x(node), pin.x);
                session.values.insert(VarKey::y(node), pin.y);
            } else {
                let seed = seeds[node];
                session.anchor(x, seed.x)?;
                session.anchor(y, seed.y)?;
                session.values.insert(VarKey::x(node), seed.x);
                session.values.insert(VarKey::y(node), seed.y);
            }
        }
        Ok(session)
    }

    fn var(&mut self, key: VarKey) -> KasuariVariable {
        if let Some(&v) = self.vars.get(&key) {
            v
        } else {
            let v = KasuariVariable::new();
            self.vars.insert(key, v);
            v
        }
    }

    fn pin(&mut self, var: KasuariVariable, value: f64) -> Result<(), AddFailure> {
        let expr: Expression = var.into();
        self.solver
            .add_constraint(expr | EQ(Strength::REQUIRED) | value)
            .map_err(|e| AddFailure::Internal(format!("pinning locked node: {}", e)))
    }

    fn anchor(&mut self, var: KasuariVariable, value: f64) -> Result<(), AddFailure> {
        self.solver
            .add_edit_variable(var, Strength::STRONG)
            .map_err(|e| AddFailure::Internal(format!("adding edit variable: {}", e)))?;
        self.solver
            .suggest_value(var, value)
            .map_err(|e| AddFailure::Internal(format!("suggesting seed value: {}", e)))
    }

    fn size_of(&self, node: &str) -> (f64, f64) {
        self.dims.get(node).copied().unwrap_or((0.0, 0.0))
    }

    fn x_expr(&mut self, node: &str) -> Expression {
        self.var(VarKey::x(node)).into()
    }

    fn y_expr(&mut self, node: &str) -> Expression {
        self.var(VarKey::y(node)).into()
    }

    fn center_expr(&mut self, node: &str, axis: Axis) -> Expression {
        let (w, h) = self.size_of(node);
        match axis {
            Axis::X => self.x_expr(node) + w / 2.0,
            Axis::Y => self.y_expr(node) + h / 2.0,
        }
    }

    fn add(&mut self, constraint: kasuari::Constraint, desc: &str) -> Result<(), AddFailure> {
        match self.solver.add_constraint(constraint) {
            Ok(()) => Ok(()),
            // A duplicate means the requirement is already in force
            Err(AddConstraintError::DuplicateConstraint) => {
                trace!("duplicate constraint skipped: {}", desc);
                Ok(())
            }
            Err(AddConstraintError::UnsatisfiableConstraint) => Err(AddFailure::Unsatisfiable {
                detail: format!("{} conflicts with accumulated constraints", desc),
            }),
            Err(AddConstraintError::InternalSolverError(msg)) => {
                Err(AddFailure::Internal(format!("{}: {}", desc, msg)))
            }
        }
    }

    /// Translate and add one layout constraint.
    pub(crate) fn apply(
        &mut self,
        constraint: &LayoutConstraint,
        usable: BoundingBox,
    ) -> Result<(), AddFailure> {
        let desc = constraint.describe();
        match &constraint.kind {
            ConstraintKind::Bounds => {
                let node = &constraint.nodes[0];
                let (w, h) = self.size_of(node);
                let x = self.x_expr(node);
                self.add(x | GE(Strength::REQUIRED) | usable.x, &desc)?;
                let x = self.x_expr(node);
                self.add(x | LE(Strength::REQUIRED) | (usable.right() - w), &desc)?;
                let y = self.y_expr(node);
                self.add(y | GE(Strength::REQUIRED) | usable.y, &desc)?;
                let y = self.y_expr(node);
                self.add(y | LE(Strength::REQUIRED) | (usable.bottom() - h), &desc)?;
                Ok(())
            }
            ConstraintKind::NoOverlap { margin } => self.apply_no_overlap(
                &constraint.nodes[0],
                &constraint.nodes[1],
                *margin,
                &desc,
            ),
            ConstraintKind::Distance { min, max, axis } => self.apply_distance(
                &constraint.nodes[0],
                &constraint.nodes[1],
                *min,
                *max,
                *axis,
                &desc,
            ),
            ConstraintKind::Alignment { axis, tolerance } => {
                let reference = &constraint.nodes[0];
                for node in &constraint.nodes[1..] {
                    let c0 = self.center_expr(reference, *axis);
                    let ci = self.center_expr(node, *axis);
                    self.add(ci | LE(Strength::REQUIRED) | c0 + *tolerance, &desc)?;
                    let c0 = self.center_expr(reference, *axis);
                    let ci = self.center_expr(node, *axis);
                    self.add(ci | GE(Strength::REQUIRED) | c0 + (-*tolerance), &desc)?;
                }
                Ok(())
            }
            ConstraintKind::Symmetry { axis, position } => {
                let (a, b) = (&constraint.nodes[0], &constraint.nodes[1]);
                // Mirror axis X: center x coordinates average to the
                // line, y coordinates match (and vice versa).
                let (mirror, cross) = match axis {
                    Axis::X => (Axis::X, Axis::Y),
                    Axis::Y => (Axis::Y, Axis::X),
                };
                let ca = self.center_expr(a, mirror);
                let cb = self.center_expr(b, mirror);
                self.add(ca + cb | EQ(Strength::REQUIRED) | 2.0 * *position, &desc)?;
                let ca = self.center_expr(a, cross);
                let cb = self.center_expr(b, cross);
                self.add(ca | EQ(Strength::REQUIRED) | cb, &desc)?;
                Ok(())
            }
            ConstraintKind::Containment { padding } => {
                let (outer, inner) = (&constraint.nodes[0], &constraint.nodes[1]);
                let (ow, oh) = self.size_of(outer);
                let (iw, ih) = self.size_of(inner);

                let ox = self.x_expr(outer);
                let ix = self.x_expr(inner);
                self.add(ix | GE(Strength::REQUIRED) | ox + *padding, &desc)?;
                let ox = self.x_expr(outer);
                let ix = self.x_expr(inner);
                self.add(ix | LE(Strength::REQUIRED) | ox + (ow - iw - *padding), &desc)?;

                let oy = self.y_expr(outer);
                let iy = self.y_expr(inner);
                self.add(iy | GE(Strength::REQUIRED) | oy + *padding, &desc)?;
                let oy = self.y_expr(outer);
                let iy = self.y_expr(inner);
                self.add(iy | LE(Strength::REQUIRED) | oy + (oh - ih - *padding), &desc)?;
                Ok(())
            }
        }
    }

    /// No-overlap is left-of OR right-of OR above OR below. Rank the four
    /// orderings by how much slack the seed placement gives them and add
    /// the first one the solver accepts.
    fn apply_no_overlap(
        &mut self,
        a: &str,
        b: &str,
        margin: f64,
        desc: &str,
    ) -> Result<(), AddFailure> {
        let sa = self.seed_rect(a);
        let sb = self.seed_rect(b);
        let (wa, ha) = self.size_of(a);
        let (wb, hb) = self.size_of(b);

        // Slack of each ordering under the seed placement
        let mut orderings = [
            (Ordering::LeftOf, sb.x - (sa.right() + margin)),
            (Ordering::RightOf, sa.x - (sb.right() + margin)),
            (Ordering::Above, sb.y - (sa.bottom() + margin)),
            (Ordering::Below, sa.y - (sb.bottom() + margin)),
        ];
        orderings.sort_by(|l, r| r.1.partial_cmp(&l.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut last_detail = String::new();
        for (ordering, slack) in orderings {
            let result = match ordering {
                Ordering::LeftOf => {
                    let ax = self.x_expr(a);
                    let bx = self.x_expr(b);
                    self.add(ax + (wa + margin) | LE(Strength::REQUIRED) | bx, desc)
                }
                Ordering::RightOf => {
                    let ax = self.x_expr(a);
                    let bx = self.x_expr(b);
                    self.add(bx + (wb + margin) | LE(Strength::REQUIRED) | ax, desc)
                }
                Ordering::Above => {
                    let ay = self.y_expr(a);
                    let by = self.y_expr(b);
                    self.add(ay + (ha + margin) | LE(Strength::REQUIRED) | by, desc)
                }
                Ordering::Below => {
                    let ay = self.y_expr(a);
                    let by = self.y_expr(b);
                    self.add(by + (hb + margin) | LE(Strength::REQUIRED) | ay, desc)
                }
            };
            match result {
                Ok(()) => {
                    trace!("{}: kept {:?} (seed slack {:.1})", desc, ordering, slack);
                    return Ok(());
                }
                Err(AddFailure::Unsatisfiable { detail }) => {
                    last_detail = detail;
                    continue;
                }
                Err(other) => return Err(other),
            }
        }
        Err(AddFailure::Unsatisfiable {
            detail: format!(
                "no separation ordering for '{}'/'{}' is satisfiable ({})",
                a, b, last_detail
            ),
        })
    }

    fn apply_distance(
        &mut self,
        a: &str,
        b: &str,
        min: f64,
        max: f64,
        axis: Option<Axis>,
        desc: &str,
    ) -> Result<(), AddFailure> {
        let sa = self.seed_rect(a).center();
        let sb = self.seed_rect(b).center();

        // Pick the constrained axis: explicit, or the dominant axis of
        // the seed offset for planar distance.
        let primary = axis.unwrap_or({
            if (sb.y - sa.y).abs() > (sb.x - sa.x).abs() {
                Axis::Y
            } else {
                Axis::X
            }
        });
        // Direction from the seeds; defaults to b after a
        let seed_delta = match primary {
            Axis::X => sb.x - sa.x,
            Axis::Y => sb.y - sa.y,
        };
        let (lead, trail) = if seed_delta < 0.0 { (b, a) } else { (a, b) };

        let lead_c = self.center_expr(lead, primary);
        let trail_c = self.center_expr(trail, primary);
        self.add(trail_c | GE(Strength::REQUIRED) | lead_c + min, desc)?;
        let lead_c = self.center_expr(lead, primary);
        let trail_c = self.center_expr(trail, primary);
        self.add(trail_c | LE(Strength::REQUIRED) | lead_c + max, desc)?;

        // Planar distance approximates Euclidean by tying the cross
        // axis; the companion is best-effort and may be discarded.
        if axis.is_none() {
            let cross = match primary {
                Axis::X => Axis::Y,
                Axis::Y => Axis::X,
            };
            let ca = self.center_expr(a, cross);
            let cb = self.center_expr(b, cross);
            if let Err(AddFailure::Unsatisfiable { detail }) =
                self.add(ca | EQ(Strength::REQUIRED) | cb, desc)
            {
                debug!("{}: cross-axis tie discarded ({})", desc, detail);
            }
        }
        Ok(())
    }

    fn seed_rect(&self, node: &str) -> BoundingBox {
        self.seeds
            .get(node)
            .copied()
            .unwrap_or_else(BoundingBox::zero)
    }

    /// Pull solved values out of the solver and produce final positions.
    pub(crate) fn extract(&mut self) -> HashMap<String, Point> {
        let changes = self.solver.fetch_changes();
        for (kvar, value) in changes {
            for (key, v) in &self.vars {
                if v == kvar {
                    self.values.insert(key.clone(), *value);
                    break;
                }
            }
        }

        let mut positions = HashMap::new();
        for node in self.seeds.keys() {
            let x = self.values.get(&VarKey::x(node)).copied().unwrap_or(0.0);
            let y = self.values.get(&VarKey::y(node)).copied().unwrap_or(0.0);
            positions.insert(node.clone(), Point::new(x, y));
        }
        positions
    }
}

#[derive(Debug, Clone, Copy)]
enum Ordering {
    LeftOf,
    RightOf,
    Above,
    Below,
}
