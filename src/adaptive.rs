//! Adaptive FGK (Faller-Gallager-Knuth) prefix coder over the 256 MTF
//! ranks, plus one not-yet-transmitted (NYT) leaf for ranks not yet seen.
//!
//! The algorithm is unchanged from the classic sibling-property
//! binary-tree construction: the code for a symbol is the path from root to
//! its leaf; every `encode` bumps the weight on that path and swaps nodes as
//! needed to keep siblings non-decreasing in weight, left to right.

use std::io;
use std::io::Write;

use crate::bitio::BitWriter;

type Symbol = usize;

const NYT: Symbol = 256;
const SYMBOL_COUNT: usize = 257;
const NODE_TABLE_COUNT: usize = SYMBOL_COUNT * 2 - 1;
const ROOT_NODE: usize = 0;
const MAX_WEIGHT: usize = 0x8000;

#[derive(Copy, Clone)]
struct Node {
    weight: usize,
    parent: Option<usize>,
    child_is_leaf: bool,
    child: usize,
}

impl Node {
    fn new() -> Self {
        Node {
            weight: 0,
            parent: None,
            child_is_leaf: false,
            child: 0,
        }
    }
}

struct Tree {
    leaf: [Option<usize>; SYMBOL_COUNT],
    next_free_node: usize,
    nodes: [Node; NODE_TABLE_COUNT],
}

impl Tree {
    fn new() -> Self {
        let mut tree = Tree {
            leaf: [None; SYMBOL_COUNT],
            next_free_node: ROOT_NODE + 1,
            nodes: [Node::new(); NODE_TABLE_COUNT],
        };
        // The NYT leaf starts at weight 1, not 0: this keeps the root's
        // weight (which only reflects this call's cumulative sum once the
        // *next* real symbol's update_model walk reaches it) strictly
        // greater than any single real-symbol subtree's weight at every
        // step, which is what keeps the swap-to-maintain-sibling-property
        // scan in `update_model` from ever trying to swap a leaf into the
        // root's own slot. A bootstrap weight of 0 here lets that happen on
        // the very first encoded symbol and corrupts the tree.
        tree.nodes[ROOT_NODE].child = NYT;
        tree.nodes[ROOT_NODE].child_is_leaf = true;
        tree.nodes[ROOT_NODE].weight = 1;
        tree.nodes[ROOT_NODE].parent = None;
        tree.leaf[NYT] = Some(ROOT_NODE);
        tree
    }

    // The old NYT leaf's slot becomes an internal node in place; its two new
    // children take the two freshly allocated slots, low-to-high. The new
    // NYT leaf MUST land on the higher of the two (`nyt_node`, which equals
    // `next_free_node - 1` once the counter is advanced) so that the next
    // call's `lightest_node = next_free_node - 1` still finds it. Putting
    // the new real symbol there instead silently discards the symbol just
    // added the next time an unseen symbol arrives.
    fn add_new_node(&mut self, sym: Symbol) {
        let lightest_node = self.next_free_node - 1;
        let sym_node = self.next_free_node;
        let nyt_node = self.next_free_node + 1;
        self.next_free_node += 2;

        self.nodes[nyt_node] = self.nodes[lightest_node];
        self.nodes[nyt_node].parent = Some(lightest_node);
        self.leaf[NYT] = Some(nyt_node);

        self.nodes[lightest_node].child = sym_node;
        self.nodes[lightest_node].child_is_leaf = false;

        self.nodes[sym_node].child = sym;
        self.nodes[sym_node].child_is_leaf = true;
        self.nodes[sym_node].weight = 0;
        self.nodes[sym_node].parent = Some(lightest_node);
        self.leaf[sym] = Some(sym_node);
    }

    fn update_model(&mut self, sym: Symbol) {
        if self.nodes[ROOT_NODE].weight == MAX_WEIGHT {
            self.rebuild_tree();
        }
        let mut mb_current_node = self.leaf[sym];
        while let Some(mut current_node) = mb_current_node {
            self.nodes[current_node].weight += 1;
            let mut new_node = current_node;
            while new_node > ROOT_NODE {
                if self.nodes[new_node - 1].weight >= self.nodes[current_node].weight {
                    break;
                }
                new_node -= 1;
            }
            if new_node != current_node {
                self.swap_nodes(current_node, new_node);
                current_node = new_node;
            }
            mb_current_node = self.nodes[current_node].parent;
        }
    }

    fn swap_nodes(&mut self, i: usize, j: usize) {
        if self.nodes[i].child_is_leaf {
            self.leaf[self.nodes[i].child] = Some(j);
        } else {
            let child = self.nodes[i].child;
            self.nodes[child].parent = Some(j);
            self.nodes[child + 1].parent = Some(j);
        }
        if self.nodes[j].child_is_leaf {
            self.leaf[self.nodes[j].child] = Some(i);
        } else {
            let child = self.nodes[j].child;
            self.nodes[child].parent = Some(i);
            self.nodes[child + 1].parent = Some(i);
        }
        let mut temp = self.nodes[i];
        self.nodes[i] = self.nodes[j];
        self.nodes[i].parent = temp.parent;
        temp.parent = self.nodes[j].parent;
        self.nodes[j] = temp;
    }

    fn rebuild_tree(&mut self) {
        let mut i;
        let mut j;
        let mut k;
        let mut weight;

        j = self.next_free_node - 1;
        i = j;
        loop {
            if self.nodes[i].child_is_leaf {
                self.nodes[j] = self.nodes[i];
                self.nodes[j].weight = (self.nodes[j].weight + 1) / 2;
                j -= 1;
            }
            if i == ROOT_NODE {
                break;
            }
            i -= 1;
        }

        i = self.next_free_node - 2;
        loop {
            k = i + 1;
            self.nodes[j].weight = self.nodes[i].weight + self.nodes[k].weight;
            weight = self.nodes[j].weight;
            self.nodes[j].child_is_leaf = false;
            k = j + 1;
            while weight < self.nodes[k].weight {
                k += 1;
            }
            k -= 1;
            for x in 0..k - j {
                self.nodes[j + x] = self.nodes[j + x + 1];
            }
            self.nodes[k].weight = weight;
            self.nodes[k].child = i;
            self.nodes[k].child_is_leaf = false;

            if j == ROOT_NODE {
                break;
            }
            i -= 2;
            j -= 1;
        }

        i = self.next_free_node - 1;
        loop {
            if self.nodes[i].child_is_leaf {
                k = self.nodes[i].child;
                self.leaf[k] = Some(i);
            } else {
                k = self.nodes[i].child;
                self.nodes[k].parent = Some(i);
                self.nodes[k + 1].parent = Some(i);
            }
            if i == ROOT_NODE {
                break;
            }
            i -= 1;
        }
    }
}

/// Adaptive prefix coder over the 256 MTF ranks. Writes its codes directly
/// into a caller-owned `BitWriter` so literal codes interleave with the
/// driver's framing and position bits in a single bitstream.
pub struct AdaptiveCoder {
    tree: Tree,
}

impl AdaptiveCoder {
    pub fn new() -> AdaptiveCoder {
        AdaptiveCoder { tree: Tree::new() }
    }

    /// Encode MTF rank `rank` (0..=255) through `bw`, then adapt the tree.
    pub fn encode<W: Write>(&mut self, rank: u8, bw: &mut BitWriter<W>) -> io::Result<()> {
        let sym = rank as Symbol;
        let mut code: u64 = 0;
        let mut code_size: u32 = 0;
        let mut current_bit: u64 = 1;

        let mut mb_current_node = self.tree.leaf[sym];
        if mb_current_node.is_none() {
            mb_current_node = self.tree.leaf[NYT];
        }

        while let Some(current_node) = mb_current_node {
            if current_node == ROOT_NODE {
                break;
            }
            if current_node & 1 == 0 {
                code |= current_bit;
            }
            current_bit <<= 1;
            code_size += 1;
            mb_current_node = self.tree.nodes[current_node].parent;
        }

        bw.put_nbits(code, code_size)?;

        if self.tree.leaf[sym].is_none() {
            bw.put_nbits(sym as u64, 8)?;
            self.tree.add_new_node(sym);
        }

        self.tree.update_model(sym);
        Ok(())
    }
}

impl Default for AdaptiveCoder {
    fn default() -> Self {
        Self::new()
    }
}
