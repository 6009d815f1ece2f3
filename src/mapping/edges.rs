//! Tabulated ionisation edges for edge prediction and labelling.

use std::fmt;

/// One ionisation edge at an integer energy loss.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IonisationEdge {
    /// Energy loss in eV.
    pub energy: u32,
    /// Element name.
    pub element: &'static str,
    /// Shell designation, e.g. `K` or `L2,3`.
    pub shell: &'static str,
}

impl fmt::Display for IonisationEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-edge", self.element, self.shell)
    }
}

const fn edge(energy: u32, element: &'static str, shell: &'static str) -> IonisationEdge {
    IonisationEdge {
        energy,
        element,
        shell,
    }
}

// Sorted by energy.
const EDGES: [IonisationEdge; 55] = [
    edge(51, "Magnesium", "L2,3"),
    edge(73, "Aluminium", "L2,3"),
    edge(86, "Lead", "O2,3"),
    edge(96, "Uranium", "O4,5"),
    edge(99, "Silicon", "L2,3"),
    edge(132, "Phosphorus", "L2,3"),
    edge(165, "Sulfur", "L2,3"),
    edge(188, "Boron", "K"),
    edge(227, "Molybdenum", "M4,5"),
    edge(284, "Carbon", "K"),
    edge(346, "Calcium", "L3"),
    edge(350, "Calcium", "L2"),
    edge(367, "Silver", "M4,5"),
    edge(381, "Uranium", "N7"),
    edge(391, "Uranium", "N6"),
    edge(401, "Nitrogen", "K"),
    edge(456, "Titanium", "L3"),
    edge(462, "Titanium", "L2"),
    edge(512, "Vanadium", "L3"),
    edge(521, "Vanadium", "L2"),
    edge(532, "Oxygen", "K"),
    edge(575, "Chromium", "L3"),
    edge(584, "Chromium", "L2"),
    edge(640, "Manganese", "L3"),
    edge(651, "Manganese", "L2"),
    edge(685, "Fluorine", "K"),
    edge(708, "Iron", "L3"),
    edge(721, "Iron", "L2"),
    edge(779, "Cobalt", "L3"),
    edge(794, "Cobalt", "L2"),
    edge(855, "Nickel", "L3"),
    edge(872, "Nickel", "L2"),
    edge(931, "Copper", "L3"),
    edge(951, "Copper", "L2"),
    edge(1020, "Zinc", "L3"),
    edge(1043, "Zinc", "L2"),
    edge(1072, "Sodium", "K"),
    edge(1115, "Gallium", "L3"),
    edge(1142, "Gallium", "L2"),
    edge(1217, "Germanium", "L3"),
    edge(1248, "Germanium", "L2"),
    edge(1305, "Magnesium", "K"),
    edge(1560, "Aluminium", "K"),
    edge(1839, "Silicon", "K"),
    edge(2146, "Phosphorus", "K"),
    edge(2206, "Gold", "M5"),
    edge(2291, "Gold", "M4"),
    edge(2484, "Lead", "M5"),
    edge(2520, "Molybdenum", "L3"),
    edge(2586, "Lead", "M4"),
    edge(2625, "Molybdenum", "L2"),
    edge(3351, "Silver", "L3"),
    edge(3524, "Silver", "L2"),
    edge(3552, "Uranium", "M5"),
    edge(3728, "Uranium", "M4"),
];

/// Lookup table of ionisation edges.
#[derive(Clone, Copy, Debug, Default)]
pub struct IonisationEdges;

impl IonisationEdges {
    /// All tabulated edges in ascending energy order.
    pub fn all() -> &'static [IonisationEdge] {
        &EDGES
    }

    /// Edge tabulated at exactly `energy` eV.
    pub fn get(energy: u32) -> Option<&'static IonisationEdge> {
        let edges = Self::all();
        edges
            .binary_search_by_key(&energy, |e| e.energy)
            .ok()
            .map(|idx| &edges[idx])
    }

    /// Edges at integer energies in `[ceil(low), high)`.
    pub fn edges_in(low: f32, high: f32) -> &'static [IonisationEdge] {
        let edges = Self::all();
        if low.is_nan() || high.is_nan() || low >= high {
            return &edges[..0];
        }
        let low = low.ceil();
        let start = edges.partition_point(|e| (e.energy as f32) < low);
        let end = edges.partition_point(|e| (e.energy as f32) < high);
        &edges[start..end.max(start)]
    }
}
