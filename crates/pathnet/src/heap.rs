#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapOrder {
    Min,
    Max,
}

impl HeapOrder {
    fn prefers<T: Ord>(self, a: &T, b: &T) -> bool {
        match self {
            HeapOrder::Min => a < b,
            HeapOrder::Max => a > b,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Heap<T> {
    order: HeapOrder,
    data: Vec<T>,
}

impl<T: Ord> Heap<T> {
    pub fn new(order: HeapOrder) -> Self {
        Self {
            order,
            data: Vec::new(),
        }
    }

    pub fn min() -> Self {
        Self::new(HeapOrder::Min)
    }

    pub fn max() -> Self {
        Self::new(HeapOrder::Max)
    }

    pub fn order(&self) -> HeapOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn push(&mut self, value: T) {
        self.data.push(value);
        self.sift_up(self.data.len() - 1);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.remove_at(0)
    }

    pub fn peek(&self) -> Option<&T> {
        self.data.first()
    }

    pub fn remove(&mut self, element: &T) -> Option<T>
    where
        T: PartialEq,
    {
        self.remove_by(|candidate| candidate == element)
    }

    pub fn remove_by<F>(&mut self, predicate: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let index = self.data.iter().position(predicate)?;
        self.remove_at(index)
    }

    pub fn replace(&mut self, old_element: &T, new_element: T) -> Option<T>
    where
        T: PartialEq,
    {
        let removed = self.remove(old_element);
        self.push(new_element);
        removed
    }

    pub fn replace_by<F>(&mut self, predicate: F, new_element: T) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let removed = self.remove_by(predicate);
        self.push(new_element);
        removed
    }

    pub fn into_sorted_vec(mut self) -> Vec<T> {
        let mut sorted = Vec::with_capacity(self.data.len());
        while let Some(value) = self.pop() {
            sorted.push(value);
        }
        sorted
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    fn remove_at(&mut self, index: usize) -> Option<T> {
        if index >= self.data.len() {
            return None;
        }

        let value = self.data.swap_remove(index);
        if index < self.data.len() {
            // The moved-in last element may belong above or below `index`.
            self.sift_down(index);
            self.sift_up(index);
        }
        Some(value)
    }

    fn sift_up(&mut self, mut child: usize) {
        while child > 0 {
            let parent = (child - 1) >> 1;
            if !self.order.prefers(&self.data[child], &self.data[parent]) {
                break;
            }
            self.data.swap(child, parent);
            child = parent;
        }
    }

    fn sift_down(&mut self, mut parent: usize) {
        let len = self.data.len();
        loop {
            let left = (parent << 1) + 1;
            let right = left + 1;
            if left >= len {
                break;
            }

            let preferred_child =
                if right < len && self.order.prefers(&self.data[right], &self.data[left]) {
                    right
                } else {
                    left
                };
            if !self
                .order
                .prefers(&self.data[preferred_child], &self.data[parent])
            {
                break;
            }
            self.data.swap(parent, preferred_child);
            parent = preferred_child;
        }
    }
}

impl<T: Ord> Default for Heap<T> {
    fn default() -> Self {
        Self::min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [i32; 12] = [9, 3, 7, 1, 8, 2, 2, 6, 5, 4, 0, 11];

    fn filled(order: HeapOrder) -> Heap<i32> {
        let mut heap = Heap::new(order);
        for value in SAMPLE {
            heap.push(value);
        }
        heap
    }

    #[test]
    fn min_heap_pops_in_ascending_order() {
        let mut expected = SAMPLE.to_vec();
        expected.sort();
        assert_eq!(filled(HeapOrder::Min).into_sorted_vec(), expected);
    }

    #[test]
    fn max_heap_pops_in_descending_order() {
        let mut expected = SAMPLE.to_vec();
        expected.sort_by(|a, b| b.cmp(a));
        assert_eq!(filled(HeapOrder::Max).into_sorted_vec(), expected);
    }

    #[test]
    fn interleaved_push_pop_keeps_order() {
        let mut heap = Heap::min();
        heap.push(5);
        heap.push(1);
        assert_eq!(heap.pop(), Some(1));
        heap.push(3);
        heap.push(0);
        assert_eq!(heap.pop(), Some(0));
        assert_eq!(heap.pop(), Some(3));
        heap.push(4);
        assert_eq!(heap.pop(), Some(4));
        assert_eq!(heap.pop(), Some(5));
        assert_eq!(heap.pop(), None);
    }

    #[test]
    fn empty_heap_access_is_checked() {
        let mut heap: Heap<i32> = Heap::max();
        assert!(heap.is_empty());
        assert_eq!(heap.peek(), None);
        assert_eq!(heap.pop(), None);
        assert_eq!(heap.remove(&3), None);
    }

    #[test]
    fn peek_reports_top_without_removing() {
        let heap = filled(HeapOrder::Max);
        assert_eq!(heap.peek(), Some(&11));
        assert_eq!(heap.len(), SAMPLE.len());
    }

    #[test]
    fn remove_arbitrary_element_keeps_heap_valid() {
        let mut heap = filled(HeapOrder::Min);
        assert_eq!(heap.remove(&6), Some(6));
        assert_eq!(heap.remove(&0), Some(0));
        assert_eq!(heap.remove(&42), None);

        let mut expected: Vec<i32> = SAMPLE.into_iter().filter(|v| *v != 6 && *v != 0).collect();
        expected.sort();
        assert_eq!(heap.into_sorted_vec(), expected);
    }

    #[test]
    fn replace_moves_element_to_new_priority() {
        let mut heap = filled(HeapOrder::Min);
        assert_eq!(heap.replace(&11, -1), Some(11));
        assert_eq!(heap.peek(), Some(&-1));
        assert_eq!(heap.len(), SAMPLE.len());
    }

    #[test]
    fn replace_by_matches_predicate() {
        let mut heap = Heap::max();
        heap.push((1, 'a'));
        heap.push((4, 'b'));
        heap.push((2, 'c'));

        let removed = heap.replace_by(|entry| entry.1 == 'c', (9, 'c'));
        assert_eq!(removed, Some((2, 'c')));
        assert_eq!(heap.pop(), Some((9, 'c')));
        assert_eq!(heap.pop(), Some((4, 'b')));
    }
}
