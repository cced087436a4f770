// Greedy quad mesher.
//
// For each of the six axis-aligned directions, every slice perpendicular to
// the normal is reduced to a 2-D mask of visible faces (non-empty voxel,
// empty or out-of-bounds neighbour across the face), then maximal
// same-colour rectangles are extracted greedily: longest run along v first,
// extended row by row along u.  Each rectangle emits one quad (two
// triangles) with winding chosen so front faces point along the normal.

use crate::grid::{DEPTH, HEIGHT, VoxelGrid, WIDTH};

// ---------------------------------------------------------------------------
// Mesh types
// ---------------------------------------------------------------------------

/// A mesh vertex: integer-lattice corner position plus the quad colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub colour: u8,
}

/// An indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Returns `true` if the mesh has no geometry.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of quads (every quad is 4 vertices, 6 indices).
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }
}

// ---------------------------------------------------------------------------
// Face directions
// ---------------------------------------------------------------------------

/// One of the six axis-aligned face directions: the outward normal, the two
/// in-plane axes (u, v), and their unit step vectors.
struct DirSpec {
    normal: [f32; 3],
    u: usize,
    v: usize,
    du: [i32; 3],
    dv: [i32; 3],
}

const DIRECTIONS: [DirSpec; 6] = [
    DirSpec { normal: [1.0, 0.0, 0.0], u: 1, v: 2, du: [0, 1, 0], dv: [0, 0, 1] },
    DirSpec { normal: [-1.0, 0.0, 0.0], u: 1, v: 2, du: [0, 1, 0], dv: [0, 0, 1] },
    DirSpec { normal: [0.0, 1.0, 0.0], u: 0, v: 2, du: [1, 0, 0], dv: [0, 0, 1] },
    DirSpec { normal: [0.0, -1.0, 0.0], u: 0, v: 2, du: [1, 0, 0], dv: [0, 0, 1] },
    DirSpec { normal: [0.0, 0.0, 1.0], u: 0, v: 1, du: [1, 0, 0], dv: [0, 1, 0] },
    DirSpec { normal: [0.0, 0.0, -1.0], u: 0, v: 1, du: [1, 0, 0], dv: [0, 1, 0] },
];

// ---------------------------------------------------------------------------
// Quad emission
// ---------------------------------------------------------------------------

fn add_quad(
    mesh: &mut Mesh,
    dir: &DirSpec,
    perp: usize,
    start: [usize; 3], // (p, u, v) in slice coordinates
    w: usize,          // extent along v
    h: usize,          // extent along u
    colour: u8,
) {
    let mut base = [0f32; 3];
    base[perp] = start[0] as f32;
    if dir.normal[perp] > 0.0 {
        base[perp] += 1.0;
    }
    base[dir.u] = start[1] as f32;
    base[dir.v] = start[2] as f32;

    let step = |du_scale: usize, dv_scale: usize| {
        [
            base[0] + (dir.du[0] * du_scale as i32 + dir.dv[0] * dv_scale as i32) as f32,
            base[1] + (dir.du[1] * du_scale as i32 + dir.dv[1] * dv_scale as i32) as f32,
            base[2] + (dir.du[2] * du_scale as i32 + dir.dv[2] * dv_scale as i32) as f32,
        ]
    };

    let mut verts = [
        Vertex { position: base, colour },
        Vertex { position: step(h, 0), colour },
        Vertex { position: step(h, w), colour },
        Vertex { position: step(0, w), colour },
    ];

    // Flip winding so front faces point along the normal; the Y axis needs
    // the opposite swap because its (u, v) pair is left-handed.
    let swap = (dir.normal[perp] < 0.0) != (perp == 1);
    if swap {
        verts.swap(1, 3);
    }

    let base_idx = mesh.vertices.len() as u32;
    mesh.vertices.extend_from_slice(&verts);
    mesh.indices.extend_from_slice(&[
        base_idx,
        base_idx + 1,
        base_idx + 2,
        base_idx,
        base_idx + 2,
        base_idx + 3,
    ]);
}

// ---------------------------------------------------------------------------
// Mesh generation
// ---------------------------------------------------------------------------

/// Generate an indexed triangle mesh of all visible voxel faces, with
/// adjacent same-colour faces merged into maximal rectangles.
pub fn generate_mesh(grid: &VoxelGrid) -> Mesh {
    let mut mesh = Mesh::default();
    let dims = [WIDTH, HEIGHT, DEPTH];

    for dir in &DIRECTIONS {
        let perp = 3 - dir.u - dir.v;
        let (du_dim, dv_dim) = (dims[dir.u], dims[dir.v]);

        for p in 0..dims[perp] {
            // Visible-face mask for this slice.
            let mut mask = vec![vec![0u8; dv_dim]; du_dim];
            let mut visited = vec![vec![false; dv_dim]; du_dim];

            for (u, row) in mask.iter_mut().enumerate() {
                for (v, cell) in row.iter_mut().enumerate() {
                    let mut pos = [0usize; 3];
                    pos[dir.u] = u;
                    pos[dir.v] = v;
                    pos[perp] = p;

                    let voxel = grid.0[pos[1]][pos[0]][pos[2]];
                    if voxel == 0 {
                        continue;
                    }

                    let mut adj = [pos[0] as isize, pos[1] as isize, pos[2] as isize];
                    adj[perp] += if dir.normal[perp] < 0.0 { -1 } else { 1 };
                    if grid.get(adj[0], adj[1], adj[2]) == 0 {
                        *cell = voxel;
                    }
                }
            }

            // Greedy rectangle extraction.
            for u in 0..du_dim {
                let mut v = 0;
                while v < dv_dim {
                    if mask[u][v] == 0 || visited[u][v] {
                        v += 1;
                        continue;
                    }
                    let colour = mask[u][v];

                    let mut width = 1;
                    while v + width < dv_dim
                        && mask[u][v + width] == colour
                        && !visited[u][v + width]
                    {
                        width += 1;
                    }

                    let mut height = 1;
                    'grow: while u + height < du_dim {
                        for w in v..v + width {
                            if mask[u + height][w] != colour || visited[u + height][w] {
                                break 'grow;
                            }
                        }
                        height += 1;
                    }

                    for row in visited.iter_mut().skip(u).take(height) {
                        for cell in row.iter_mut().skip(v).take(width) {
                            *cell = true;
                        }
                    }

                    add_quad(&mut mesh, dir, perp, [p, u, v], width, height, colour);
                    v += width;
                }
            }
        }
    }
    mesh
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
