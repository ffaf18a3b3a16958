use crate::cost::{CostModel, UnitCostModel};
use crate::parsing::{invert_label_dict, LabelDict, LabelId, ParsedTree};
use indextree::NodeEdge;

use rustc_hash::FxHashMap;

pub trait Indexer {
    fn index_tree(tree: &ParsedTree, label_dict: &LabelDict) -> Self
    where
        Self: Sized;
}

#[derive(Debug)]
pub struct ConstantsIndex {
    pub tree_size: usize,
}

#[derive(Debug)]
pub struct SEDIndex {
    pub preorder: Vec<LabelId>,
    pub postorder: Vec<LabelId>,
    pub c: ConstantsIndex,
}

impl Indexer for SEDIndex {
    fn index_tree(tree: &ParsedTree, _label_dict: &LabelDict) -> Self {
        let Some(root) = tree.iter().next() else {
            panic!("Unable to get root but tree is not empty!");
        };
        let root_id = tree.get_node_id(root).unwrap();

        let mut pre = Vec::with_capacity(tree.count());
        let mut post = Vec::with_capacity(tree.count());

        for edge in root_id.traverse(tree) {
            match edge {
                NodeEdge::Start(nid) => pre.push(*tree.get(nid).unwrap().get()),
                NodeEdge::End(nid) => post.push(*tree.get(nid).unwrap().get()),
            }
        }

        Self {
            postorder: post,
            preorder: pre,
            c: ConstantsIndex {
                tree_size: tree.count(),
            },
        }
    }
}

pub type InvListLblPost = FxHashMap<LabelId, Vec<i32>>;

/// Inverted list of nodes, key is index which is the label id in label dict
/// and postings list contains postorder traversal number
#[derive(Debug)]
pub struct InvertedListLabelPostorderIndex {
    pub inverted_list: InvListLblPost,
    pub c: ConstantsIndex,
}

impl Indexer for InvertedListLabelPostorderIndex {
    fn index_tree(tree: &ParsedTree, _label_dict: &LabelDict) -> Self {
        let Some(root) = tree.iter().next() else {
            panic!("Unable to get root but tree is not empty!");
        };
        let mut inverted_list = InvListLblPost::default();
        let root_id = tree.get_node_id(root).unwrap();

        let mut postorder_id = 0;
        for edge in root_id.traverse(tree) {
            if let NodeEdge::End(nid) = edge {
                let label = tree.get(nid).unwrap().get();
                inverted_list
                    .entry(*label)
                    .and_modify(|postings| postings.push(postorder_id))
                    .or_insert(vec![postorder_id]);
                postorder_id += 1;
            }
        }

        Self {
            inverted_list,
            c: ConstantsIndex {
                tree_size: tree.count(),
            },
        }
    }
}

/// JSON node type tags stored in [`TreeIndex::postl_to_type`].
pub const NODE_TYPE_OBJECT: u8 = 0;
pub const NODE_TYPE_ARRAY: u8 = 1;
pub const NODE_TYPE_KEY: u8 = 2;
pub const NODE_TYPE_VALUE: u8 = 3;

/// Bracket-notation label of an object node. The braces must be escaped in
/// the input, so the interned label keeps the backslashes.
pub const OBJECT_LABEL: &str = r"\{\}";
/// Bracket-notation label of an array node.
pub const ARRAY_LABEL: &str = "[]";

/// The full per-tree index bundle shared by the distance engines. All arrays
/// are indexed by left-to-right postorder unless the name says otherwise.
/// `-1` encodes "no such node" throughout.
#[derive(Debug)]
pub struct TreeIndex {
    pub c: ConstantsIndex,
    /// Interned label of each node.
    pub postl_to_label_id: Vec<LabelId>,
    /// Subtree size, counting the node itself.
    pub postl_to_size: Vec<i32>,
    /// Parent postorder id, `-1` for the root.
    pub postl_to_parent: Vec<i32>,
    /// Child postorder ids, left to right.
    pub postl_to_children: Vec<Vec<i32>>,
    /// Depth from the root (root = 0).
    pub postl_to_depth: Vec<i32>,
    /// Postorder id of the leftmost leaf descendant.
    pub postl_to_lld: Vec<i32>,
    /// Postorder id of the leftmost child, `-1` for leaves. Chasing this
    /// pointer walks down the left spine.
    pub postl_to_lch: Vec<i32>,
    /// Deepest absolute depth inside the subtree.
    pub postl_to_subtree_max_depth: Vec<i32>,
    /// Height of the subtree (leaf = 0).
    pub postl_to_height: Vec<i32>,
    /// Postorder id of the nearest keyroot ancestor (possibly the node itself).
    pub postl_to_kr_ancestor: Vec<i32>,
    /// Postorder id of the first leaf to the right, `-1` if none.
    pub postl_to_rl: Vec<i32>,
    /// Left-to-right preorder id of each node.
    pub postl_to_prel: Vec<i32>,
    /// Postorder id of each node, indexed in left-to-right preorder.
    pub prel_to_postl: Vec<i32>,
    /// Keyroot nodes (root or not a leftmost child), ascending postorder.
    pub list_kr: Vec<i32>,
    /// For each depth value, the postorder ids at that depth, ascending.
    pub inverted_list_depth_to_postl: Vec<Vec<i32>>,
    /// For each label, the postorder ids carrying it, ascending.
    pub inverted_list_label_id_to_postl: InvListLblPost,
    /// JSON type tag: object, array, key or value.
    pub postl_to_type: Vec<u8>,
    /// Postorder id of the favorable child (max subtree height), `-1` for
    /// leaves.
    pub postl_to_fav_child: Vec<i32>,
    /// Postorder id of the sibling immediately left of the favorable child,
    /// `-1` if the favorable child is leftmost.
    pub postl_to_left_fav_child: Vec<i32>,
    /// Postorder ids in favorable-child order: at every node the favorable
    /// child subtree is traversed first, then the remaining children left to
    /// right; ids are assigned on exit.
    pub favorder_to_postl: Vec<i32>,
    /// Prefix sums of the ascending-sorted child subtree sizes; entry `c` is
    /// the cheapest cost of dropping `c + 1` children entirely.
    pub postl_to_ordered_child_size: Vec<Vec<i32>>,
}

impl TreeIndex {
    #[inline(always)]
    pub fn is_leaf(&self, postl: i32) -> bool {
        self.postl_to_size[postl as usize] == 1
    }

    pub fn tree_size(&self) -> usize {
        self.c.tree_size
    }
}

impl Indexer for TreeIndex {
    fn index_tree(tree: &ParsedTree, label_dict: &LabelDict) -> Self {
        let tree_size = tree.count();
        let Some(root) = tree.iter().next() else {
            panic!("Unable to get root but tree is not empty!");
        };
        let root_id = tree.get_node_id(root).unwrap();
        let id_to_label = invert_label_dict(label_dict);

        let mut postl_to_label_id = Vec::with_capacity(tree_size);
        let mut postl_to_size = Vec::with_capacity(tree_size);
        let mut postl_to_parent = vec![-1i32; tree_size];
        let mut postl_to_children: Vec<Vec<i32>> = Vec::with_capacity(tree_size);
        let mut postl_to_depth = Vec::with_capacity(tree_size);
        let mut postl_to_lld = Vec::with_capacity(tree_size);
        let mut postl_to_lch = Vec::with_capacity(tree_size);
        let mut postl_to_subtree_max_depth = Vec::with_capacity(tree_size);
        let mut postl_to_height = Vec::with_capacity(tree_size);
        let mut postl_to_prel = Vec::with_capacity(tree_size);
        let mut prel_to_postl = vec![0i32; tree_size];
        let mut list_kr = vec![];
        let mut inverted_list_depth_to_postl: Vec<Vec<i32>> = vec![];
        let mut inverted_list_label_id_to_postl = InvListLblPost::default();
        let mut postl_to_type = Vec::with_capacity(tree_size);

        // Child-id frames of the nodes on the path from the root to the
        // currently traversed node. The traversal itself is iterative, so
        // deep trees cannot exhaust the call stack.
        let mut frames: Vec<Vec<i32>> = vec![vec![]];
        let mut depth = -1i32;
        let mut postorder = 0i32;
        let mut preorder = 0i32;

        for edge in root_id.traverse(tree) {
            match edge {
                NodeEdge::Start(_) => {
                    depth += 1;
                    frames.push(vec![]);
                    preorder += 1;
                }
                NodeEdge::End(nid) => {
                    let children = frames.pop().unwrap();
                    let label = *tree.get(nid).unwrap().get();

                    let mut size = 1i32;
                    let mut max_depth = depth;
                    let mut height = 0i32;
                    for c in children.iter() {
                        size += postl_to_size[*c as usize];
                        max_depth = max_depth.max(postl_to_subtree_max_depth[*c as usize]);
                        height = height.max(postl_to_height[*c as usize] + 1);
                        postl_to_parent[*c as usize] = postorder;
                    }
                    let lld = children
                        .first()
                        .map_or(postorder, |first| postl_to_lld[*first as usize]);
                    let lch = children.first().copied().unwrap_or(-1);

                    let node_type = if children.is_empty() {
                        NODE_TYPE_VALUE
                    } else {
                        match id_to_label[label as usize] {
                            OBJECT_LABEL => NODE_TYPE_OBJECT,
                            ARRAY_LABEL => NODE_TYPE_ARRAY,
                            _ => NODE_TYPE_KEY,
                        }
                    };

                    postl_to_label_id.push(label);
                    postl_to_size.push(size);
                    postl_to_depth.push(depth);
                    postl_to_lld.push(lld);
                    postl_to_lch.push(lch);
                    postl_to_subtree_max_depth.push(max_depth);
                    postl_to_height.push(height);
                    postl_to_children.push(children);
                    postl_to_type.push(node_type);

                    // The preorder counter is one past this node's preorder
                    // minus its descendants.
                    let prel = preorder - size;
                    postl_to_prel.push(prel);
                    prel_to_postl[prel as usize] = postorder;

                    if inverted_list_depth_to_postl.len() <= depth as usize {
                        inverted_list_depth_to_postl.resize(depth as usize + 1, vec![]);
                    }
                    inverted_list_depth_to_postl[depth as usize].push(postorder);
                    inverted_list_label_id_to_postl
                        .entry(label)
                        .and_modify(|postings| postings.push(postorder))
                        .or_insert(vec![postorder]);

                    frames.last_mut().unwrap().push(postorder);
                    depth -= 1;
                    postorder += 1;
                }
            }
        }

        // Keyroots: the root and every node that is not a leftmost child.
        for postl in 0..tree_size as i32 {
            let parent = postl_to_parent[postl as usize];
            if parent == -1 || postl_to_lld[parent as usize] != postl_to_lld[postl as usize] {
                list_kr.push(postl);
            }
        }

        // Nearest keyroot ancestors; parents have larger postorder ids, so a
        // descending scan sees them first.
        let mut postl_to_kr_ancestor = vec![0i32; tree_size];
        let mut is_kr = vec![false; tree_size];
        for kr in list_kr.iter() {
            is_kr[*kr as usize] = true;
        }
        for postl in (0..tree_size).rev() {
            postl_to_kr_ancestor[postl] = if is_kr[postl] {
                postl as i32
            } else {
                postl_to_kr_ancestor[postl_to_parent[postl] as usize]
            };
        }

        // First leaf to the right, found by a reverse postorder scan.
        let mut postl_to_rl = vec![-1i32; tree_size];
        let mut current_leaf = -1i32;
        for postl in (0..tree_size).rev() {
            postl_to_rl[postl] = current_leaf;
            if postl_to_size[postl] == 1 {
                current_leaf = postl as i32;
            }
        }

        // Favorable children and the favorable-child traversal order.
        let mut postl_to_fav_child = vec![-1i32; tree_size];
        let mut postl_to_left_fav_child = vec![-1i32; tree_size];
        let mut postl_to_ordered_child_size: Vec<Vec<i32>> = Vec::with_capacity(tree_size);
        for postl in 0..tree_size {
            let children = &postl_to_children[postl];
            let mut fav = -1i32;
            let mut fav_height = -1i32;
            for (ci, c) in children.iter().enumerate() {
                if postl_to_height[*c as usize] > fav_height {
                    fav_height = postl_to_height[*c as usize];
                    fav = *c;
                    postl_to_left_fav_child[postl] = if ci == 0 { -1 } else { children[ci - 1] };
                }
            }
            postl_to_fav_child[postl] = fav;

            let mut sizes = children
                .iter()
                .map(|c| postl_to_size[*c as usize])
                .collect::<Vec<_>>();
            sizes.sort_unstable();
            let mut sum = 0;
            for s in sizes.iter_mut() {
                sum += *s;
                *s = sum;
            }
            postl_to_ordered_child_size.push(sizes);
        }

        let mut favorder_to_postl = vec![0i32; tree_size];
        let mut favorder = 0usize;
        // Exit-marker stack: (node, children already ordered fav-first).
        let mut stack: Vec<(i32, bool)> = vec![((tree_size - 1) as i32, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                favorder_to_postl[favorder] = node;
                favorder += 1;
                continue;
            }
            stack.push((node, true));
            let children = &postl_to_children[node as usize];
            let fav = postl_to_fav_child[node as usize];
            // Pushed in reverse so the favorable child is expanded first.
            for c in children.iter().rev() {
                if *c != fav {
                    stack.push((*c, false));
                }
            }
            if fav != -1 {
                stack.push((fav, false));
            }
        }

        Self {
            c: ConstantsIndex { tree_size },
            postl_to_label_id,
            postl_to_size,
            postl_to_parent,
            postl_to_children,
            postl_to_depth,
            postl_to_lld,
            postl_to_lch,
            postl_to_subtree_max_depth,
            postl_to_height,
            postl_to_kr_ancestor,
            postl_to_rl,
            postl_to_prel,
            prel_to_postl,
            list_kr,
            inverted_list_depth_to_postl,
            inverted_list_label_id_to_postl,
            postl_to_type,
            postl_to_fav_child,
            postl_to_left_fav_child,
            favorder_to_postl,
            postl_to_ordered_child_size,
        }
    }
}

/// Preorder-indexed bundle for APTED. Arrays keep the `prel`/`prer`/`postl`/
/// `postr` prefixes naming the traversal they are indexed in.
pub struct AptedIndex {
    pub c: ConstantsIndex,
    /// Stores label id of each node in a tree, indexed in left-to-right
    /// preorder.
    pub prel_to_label_id_: Vec<LabelId>,
    /// Subtree size, indexed in left-to-right preorder.
    pub prel_to_size_: Vec<i32>,
    /// Left-to-right preorder id of the parent node, `-1` for the root.
    pub prel_to_parent_: Vec<i32>,
    /// Left-to-right preorder ids of each node's children.
    pub prel_to_children_: Vec<Vec<i32>>,
    /// Left-to-right postorder id of the leftmost leaf descendant, indexed in
    /// left-to-right postorder.
    pub postl_to_lld_: Vec<i32>,
    /// Right-to-left postorder id of the rightmost leaf descendant, indexed
    /// in right-to-left postorder.
    pub postr_to_rld_: Vec<i32>,
    /// First leaf to the left in left-to-right preorder, `-1` if none.
    pub prel_to_ln_: Vec<i32>,
    /// First leaf to the right in right-to-left preorder, `-1` if none.
    pub prer_to_ln_: Vec<i32>,
    /// True if the node is the leftmost child of its parent.
    pub prel_to_type_left_: Vec<bool>,
    /// True if the node is the rightmost child of its parent.
    pub prel_to_type_right_: Vec<bool>,
    // Traversal translations.
    pub prel_to_prer_: Vec<i32>,
    pub prer_to_prel_: Vec<i32>,
    pub prel_to_postl_: Vec<i32>,
    pub postl_to_prel_: Vec<i32>,
    pub prel_to_postr_: Vec<i32>,
    pub postr_to_prel_: Vec<i32>,
    /// Cost of the single-path function for each subtree [APTED, Section 5.2]:
    /// `cost_all_` for the inner path, `cost_left_`/`cost_right_` for the
    /// left/right paths. Indexed in left-to-right preorder.
    pub prel_to_cost_all_: Vec<i64>,
    pub prel_to_cost_left_: Vec<i64>,
    pub prel_to_cost_right_: Vec<i64>,
    /// Cost of deleting/inserting the entire subtree, indexed in left-to-right
    /// preorder.
    pub prel_to_subtree_del_cost_: Vec<f64>,
    pub prel_to_subtree_ins_cost_: Vec<f64>,
}

impl AptedIndex {
    pub fn new(tree: &ParsedTree, _label_dict: &LabelDict, costs: &impl CostModel) -> Self {
        let tree_size = tree.count();
        let Some(root) = tree.iter().next() else {
            panic!("Unable to get root but tree is not empty!");
        };
        let root_id = tree.get_node_id(root).unwrap();

        let mut idx = Self {
            c: ConstantsIndex { tree_size },
            prel_to_label_id_: vec![0; tree_size],
            prel_to_size_: vec![0; tree_size],
            prel_to_parent_: vec![-1; tree_size],
            prel_to_children_: vec![vec![]; tree_size],
            postl_to_lld_: vec![0; tree_size],
            postr_to_rld_: vec![0; tree_size],
            prel_to_ln_: vec![-1; tree_size],
            prer_to_ln_: vec![-1; tree_size],
            prel_to_type_left_: vec![false; tree_size],
            prel_to_type_right_: vec![false; tree_size],
            prel_to_prer_: vec![0; tree_size],
            prer_to_prel_: vec![0; tree_size],
            prel_to_postl_: vec![0; tree_size],
            postl_to_prel_: vec![0; tree_size],
            prel_to_postr_: vec![0; tree_size],
            postr_to_prel_: vec![0; tree_size],
            prel_to_cost_all_: vec![0; tree_size],
            prel_to_cost_left_: vec![0; tree_size],
            prel_to_cost_right_: vec![0; tree_size],
            prel_to_subtree_del_cost_: vec![0.0; tree_size],
            prel_to_subtree_ins_cost_: vec![0.0; tree_size],
        };

        // Per-node accumulators carried across the traversal, mirroring the
        // postorder recurrences for descendant size sums and subtree costs.
        struct Accum {
            prel: i32,
            children: Vec<i32>,
            size: i32,
            desc_sizes: i32,
            del_cost: f64,
            ins_cost: f64,
        }

        let mut accum_stack: Vec<Accum> = vec![];
        let mut preorder = 0i32;
        let mut postorder = 0i32;
        let n = tree_size as i32;

        for edge in root_id.traverse(tree) {
            match edge {
                NodeEdge::Start(nid) => {
                    let prel = preorder;
                    preorder += 1;
                    idx.prel_to_label_id_[prel as usize] = *tree.get(nid).unwrap().get();
                    accum_stack.push(Accum {
                        prel,
                        children: vec![],
                        size: 0,
                        desc_sizes: 0,
                        del_cost: 0.0,
                        ins_cost: 0.0,
                    });
                }
                NodeEdge::End(nid) => {
                    let a = accum_stack.pop().unwrap();
                    let prel = a.prel;
                    let label = *tree.get(nid).unwrap().get();
                    let size = a.size + 1;
                    let current_desc_sizes = a.desc_sizes + a.size + 1;

                    idx.prel_to_size_[prel as usize] = size;
                    idx.prel_to_children_[prel as usize] = a.children;
                    idx.prel_to_cost_all_[prel as usize] =
                        ((size as i64) * (size as i64 + 3)) / 2 - current_desc_sizes as i64;
                    idx.prel_to_subtree_del_cost_[prel as usize] = a.del_cost + costs.del(label);
                    idx.prel_to_subtree_ins_cost_[prel as usize] = a.ins_cost + costs.ins(label);

                    // Right-to-left postorder reverses preorder; right-to-left
                    // preorder reverses postorder.
                    let postr = n - 1 - prel;
                    let prer = n - 1 - postorder;
                    idx.prel_to_postl_[prel as usize] = postorder;
                    idx.postl_to_prel_[postorder as usize] = prel;
                    idx.prel_to_postr_[prel as usize] = postr;
                    idx.postr_to_prel_[postr as usize] = prel;
                    idx.prel_to_prer_[prel as usize] = prer;
                    idx.prer_to_prel_[prer as usize] = prel;

                    if let Some(parent) = accum_stack.last_mut() {
                        idx.prel_to_parent_[prel as usize] = parent.prel;
                        parent.children.push(prel);
                        parent.size += size;
                        parent.desc_sizes += current_desc_sizes;
                        parent.del_cost += a.del_cost + costs.del(label);
                        parent.ins_cost += a.ins_cost + costs.ins(label);
                    }

                    postorder += 1;
                }
            }
        }

        // Leftmost/rightmost child flags from the children lists.
        for prel in 0..tree_size {
            if let Some(first) = idx.prel_to_children_[prel].first() {
                idx.prel_to_type_left_[*first as usize] = true;
            }
            if let Some(last) = idx.prel_to_children_[prel].last() {
                idx.prel_to_type_right_[*last as usize] = true;
            }
        }
        // Keyroot size sums, bottom-up in reverse preorder (children have
        // larger preorder ids than their parent). The sum over a subtree
        // covers the subtree root plus every node that is not a leftmost
        // (resp. rightmost) child.
        for prel in (0..tree_size).rev() {
            let mut kr_sum = 0i64;
            let mut rev_kr_sum = 0i64;
            for (ci, c) in idx.prel_to_children_[prel].iter().enumerate() {
                kr_sum += idx.prel_to_cost_left_[*c as usize];
                rev_kr_sum += idx.prel_to_cost_right_[*c as usize];
                if ci == 0 {
                    kr_sum -= idx.prel_to_size_[*c as usize] as i64;
                }
                if ci == idx.prel_to_children_[prel].len() - 1 {
                    rev_kr_sum -= idx.prel_to_size_[*c as usize] as i64;
                }
            }
            idx.prel_to_cost_left_[prel] = kr_sum + idx.prel_to_size_[prel] as i64;
            idx.prel_to_cost_right_[prel] = rev_kr_sum + idx.prel_to_size_[prel] as i64;
        }

        // Leftmost/rightmost leaf descendants via contiguous postorder ranges.
        for postl in 0..tree_size as i32 {
            let prel = idx.postl_to_prel_[postl as usize];
            idx.postl_to_lld_[postl as usize] = postl - idx.prel_to_size_[prel as usize] + 1;
        }
        for postr in 0..tree_size as i32 {
            let prel = idx.postr_to_prel_[postr as usize];
            idx.postr_to_rld_[postr as usize] = postr - idx.prel_to_size_[prel as usize] + 1;
        }

        // First-leaf-to-the-left (preorder) and to-the-right (reverse
        // preorder) pointers.
        let mut current_leaf = -1i32;
        for prel in 0..tree_size as i32 {
            idx.prel_to_ln_[prel as usize] = current_leaf;
            if idx.prel_to_size_[prel as usize] == 1 {
                current_leaf = prel;
            }
        }
        current_leaf = -1;
        for prer in 0..tree_size as i32 {
            idx.prer_to_ln_[prer as usize] = current_leaf;
            if idx.prel_to_size_[idx.prer_to_prel_[prer as usize] as usize] == 1 {
                current_leaf = prer;
            }
        }

        idx
    }

    #[inline(always)]
    pub fn is_leaf(&self, prel: i32) -> bool {
        self.prel_to_size_[prel as usize] == 1
    }

    /// Left-to-right preorder of the leftmost leaf descendant.
    #[inline(always)]
    pub fn prel_to_lld(&self, prel: i32) -> i32 {
        self.postl_to_prel_
            [self.postl_to_lld_[self.prel_to_postl_[prel as usize] as usize] as usize]
    }

    /// Left-to-right preorder of the rightmost leaf descendant.
    #[inline(always)]
    pub fn prel_to_rld(&self, prel: i32) -> i32 {
        self.postr_to_prel_
            [self.postr_to_rld_[self.prel_to_postr_[prel as usize] as usize] as usize]
    }
}

impl Indexer for AptedIndex {
    fn index_tree(tree: &ParsedTree, label_dict: &LabelDict) -> Self {
        Self::new(tree, label_dict, &UnitCostModel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse_single;

    #[test]
    fn test_pre_and_postorder() {
        let tree_str = "{1{2{5}{6}}{3{7}}{4{8}{9}}}".to_owned();
        // parsed labels will be
        // 1 -> 0
        // 2 -> 1
        // 5 -> 2
        // 6 -> 3
        // 3 -> 4
        // 7 -> 5
        // 4 -> 6
        // 8 -> 7
        // 9 -> 8
        let mut label_dict = LabelDict::new();
        let parsed_tree = parse_single(tree_str, &mut label_dict).unwrap();

        let sed_index = SEDIndex::index_tree(&parsed_tree, &label_dict);
        assert_eq!(sed_index.preorder, vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(sed_index.postorder, vec![2, 3, 1, 5, 4, 7, 8, 6, 0]);
    }

    #[test]
    fn test_inverted_list_postorder_index() {
        let tree_str = "{a{a{f}{b}{x}}{b}{y}}".to_owned();
        /*
        Parsed labels will be:
        a -> 0
        f -> 1
        b -> 2
        x -> 3
        y -> 4
         */
        let mut label_dict = LabelDict::new();
        let tree = parse_single(tree_str, &mut label_dict).unwrap();
        let idx = InvertedListLabelPostorderIndex::index_tree(&tree, &label_dict);

        let kvs = [
            (0, vec![3, 6]),
            (1, vec![0]),
            (2, vec![1, 4]),
            (3, vec![2]),
            (4, vec![5]),
        ];

        let mut qh = InvListLblPost::default();

        for (k, v) in kvs {
            qh.insert(k, v);
        }

        assert_eq!(idx.inverted_list, qh);
    }

    #[test]
    fn test_single_node_index() {
        let mut ld = LabelDict::new();
        let tree = parse_single("{a}".to_owned(), &mut ld).unwrap();
        let idx = TreeIndex::index_tree(&tree, &ld);

        assert_eq!(idx.postl_to_size, vec![1]);
        assert_eq!(idx.postl_to_lld, vec![0]);
        assert_eq!(idx.list_kr, vec![0]);
        assert_eq!(idx.postl_to_depth, vec![0]);
        assert_eq!(idx.postl_to_children, vec![Vec::<i32>::new()]);
        assert_eq!(idx.postl_to_parent, vec![-1]);
        assert_eq!(idx.postl_to_lch, vec![-1]);
    }

    #[test]
    fn test_tree_index_arrays() {
        // postorder: d=0, e=1, b=2, c=3, a=4
        let mut ld = LabelDict::new();
        let tree = parse_single("{a{b{d}{e}}{c}}".to_owned(), &mut ld).unwrap();
        let idx = TreeIndex::index_tree(&tree, &ld);

        assert_eq!(idx.postl_to_size, vec![1, 1, 3, 1, 5]);
        assert_eq!(idx.postl_to_parent, vec![2, 2, 4, 4, -1]);
        assert_eq!(idx.postl_to_depth, vec![2, 2, 1, 1, 0]);
        assert_eq!(idx.postl_to_lld, vec![0, 1, 0, 3, 0]);
        assert_eq!(idx.postl_to_lch, vec![-1, -1, 0, -1, 2]);
        assert_eq!(idx.list_kr, vec![1, 3, 4]);
        assert_eq!(idx.postl_to_kr_ancestor, vec![4, 1, 4, 3, 4]);
        assert_eq!(idx.postl_to_prel, vec![2, 3, 1, 4, 0]);
        assert_eq!(idx.prel_to_postl, vec![4, 2, 0, 1, 3]);
        assert_eq!(idx.postl_to_rl, vec![1, 3, 3, -1, -1]);
        assert_eq!(idx.postl_to_height, vec![0, 0, 1, 0, 2]);
        assert_eq!(idx.postl_to_subtree_max_depth, vec![2, 2, 2, 1, 2]);
        assert_eq!(
            idx.postl_to_children,
            vec![vec![], vec![], vec![0, 1], vec![], vec![2, 3]]
        );
        assert_eq!(idx.inverted_list_depth_to_postl[1], vec![2, 3]);
        assert_eq!(idx.inverted_list_depth_to_postl[2], vec![0, 1]);
    }

    #[test]
    fn test_descendants_form_contiguous_range() {
        let mut ld = LabelDict::new();
        let tree = parse_single("{a{b{c}{d{e}{f}}}{g{h}}}".to_owned(), &mut ld).unwrap();
        let idx = TreeIndex::index_tree(&tree, &ld);
        for postl in 0..idx.tree_size() as i32 {
            let lld = idx.postl_to_lld[postl as usize];
            let size = idx.postl_to_size[postl as usize];
            assert_eq!(postl - lld + 1, size);
        }
    }

    #[test]
    fn test_favorable_child_order() {
        // postorder: b=0, e=1, d=2, c=3, a=4; c is a's favorable child.
        let mut ld = LabelDict::new();
        let tree = parse_single("{a{b}{c{d{e}}}}".to_owned(), &mut ld).unwrap();
        let idx = TreeIndex::index_tree(&tree, &ld);

        assert_eq!(idx.postl_to_fav_child, vec![-1, -1, 1, 2, 3]);
        assert_eq!(idx.postl_to_left_fav_child, vec![-1, -1, -1, -1, 0]);
        assert_eq!(idx.favorder_to_postl, vec![1, 2, 3, 0, 4]);
    }

    #[test]
    fn test_ordered_child_sizes_are_prefix_sums() {
        let mut ld = LabelDict::new();
        let tree = parse_single("{a{b{x}{y}}{c}{d{z}}}".to_owned(), &mut ld).unwrap();
        let idx = TreeIndex::index_tree(&tree, &ld);
        // Root children subtree sizes are 3, 1, 2 -> sorted 1, 2, 3.
        let root = idx.tree_size() as i32 - 1;
        assert_eq!(
            idx.postl_to_ordered_child_size[root as usize],
            vec![1, 3, 6]
        );
    }

    #[test]
    fn test_json_type_tags() {
        let mut ld = LabelDict::new();
        let tree = parse_single(r"{\{\}{key1{17}}{key2{[]{3}{4}}}}".to_owned(), &mut ld).unwrap();
        let idx = TreeIndex::index_tree(&tree, &ld);
        // postorder: 17=0, key1=1, 3=2, 4=3, []=4, key2=5, {}=6
        assert_eq!(
            idx.postl_to_type,
            vec![
                NODE_TYPE_VALUE,
                NODE_TYPE_KEY,
                NODE_TYPE_VALUE,
                NODE_TYPE_VALUE,
                NODE_TYPE_ARRAY,
                NODE_TYPE_KEY,
                NODE_TYPE_OBJECT
            ]
        );
    }

    #[test]
    fn test_apted_index_translations() {
        let mut ld = LabelDict::new();
        let tree = parse_single("{a{b{d}{e}}{c}}".to_owned(), &mut ld).unwrap();
        let idx = AptedIndex::index_tree(&tree, &ld);

        // preorder: a=0, b=1, d=2, e=3, c=4
        assert_eq!(idx.prel_to_size_, vec![5, 3, 1, 1, 1]);
        assert_eq!(idx.prel_to_parent_, vec![-1, 0, 1, 1, 0]);
        assert_eq!(idx.prel_to_postl_, vec![4, 2, 0, 1, 3]);
        assert_eq!(idx.postl_to_prel_, vec![2, 3, 1, 4, 0]);
        // right-to-left preorder: a=0, c=1, b=2, e=3, d=4
        assert_eq!(idx.prel_to_prer_, vec![0, 2, 4, 3, 1]);
        assert_eq!(idx.prer_to_prel_, vec![0, 4, 1, 3, 2]);
        assert_eq!(idx.prel_to_type_left_, vec![false, true, true, false, false]);
        assert_eq!(
            idx.prel_to_type_right_,
            vec![false, false, false, true, true]
        );
        // Unit cost model: subtree deletion cost equals subtree size.
        assert_eq!(
            idx.prel_to_subtree_del_cost_,
            vec![5.0, 3.0, 1.0, 1.0, 1.0]
        );
    }

    #[test]
    fn test_apted_index_leaf_descendants() {
        let mut ld = LabelDict::new();
        let tree = parse_single("{a{b{d}{e}}{c}}".to_owned(), &mut ld).unwrap();
        let idx = AptedIndex::index_tree(&tree, &ld);

        // postorder: d=0, e=1, b=2, c=3, a=4
        assert_eq!(idx.postl_to_lld_, vec![0, 1, 0, 3, 0]);
        // right-to-left postorder: c=0, e=1, d=2, b=3, a=4
        assert_eq!(idx.postr_to_rld_, vec![0, 1, 2, 1, 0]);
        // preorder translations of leaf descendants
        assert_eq!(idx.prel_to_lld(0), 2);
        assert_eq!(idx.prel_to_rld(0), 4);
        assert_eq!(idx.prel_to_rld(1), 3);
    }

    #[test]
    fn test_indexing_is_idempotent() {
        let mut ld = LabelDict::new();
        let tree = parse_single("{a{b{c}{d}}{e}}".to_owned(), &mut ld).unwrap();
        let i1 = TreeIndex::index_tree(&tree, &ld);
        let i2 = TreeIndex::index_tree(&tree, &ld);
        assert_eq!(i1.postl_to_size, i2.postl_to_size);
        assert_eq!(i1.postl_to_lld, i2.postl_to_lld);
        assert_eq!(i1.list_kr, i2.list_kr);
        assert_eq!(i1.postl_to_label_id, i2.postl_to_label_id);
    }
}
