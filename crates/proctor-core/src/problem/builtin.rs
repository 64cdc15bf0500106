use super::{Problem, ProblemExample};

const HARNESS: &str = r#"const testCases = __CASES__;

let passed = 0;
let failed = 0;

testCases.forEach((test, i) => {
    try {
__CHECK__
        if (isCorrect) {
            console.log(`✓ Test ${i + 1} passed`);
            passed++;
        } else {
            console.error(`✗ Test ${i + 1} failed: got ${JSON.stringify(actual)}`);
            failed++;
        }
    } catch (error) {
        console.error(`✗ Test ${i + 1} failed: ${error.message}`);
        failed++;
    }
});

console.log(`\n${passed}/${testCases.length} tests passed`);
if (failed > 0) process.exit(1);"#;

fn harness(cases: &str, check: &str) -> String {
    HARNESS.replace("__CASES__", cases).replace("__CHECK__", check)
}

fn example(input: &str, output: &str, explanation: &str) -> ProblemExample {
    ProblemExample {
        input: input.to_string(),
        output: output.to_string(),
        explanation: explanation.to_string(),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub(super) fn problems() -> Vec<Problem> {
    vec![
        Problem {
            id: "two-sum".to_string(),
            title: "Two Sum".to_string(),
            difficulty: "easy".to_string(),
            description: "Given an array of integers `nums` and an integer `target`, return the \
                          indices of the two numbers that add up to the target."
                .to_string(),
            initial_code: "// Given an array of integers and a target sum,\n\
                           // return the indices of two numbers that add up to the target.\n\n\
                           function twoSum(nums, target) {\n    // Your code here\n    \n}\n"
                .to_string(),
            export_name: "twoSum".to_string(),
            test_fixture: harness(
                "[\n    { nums: [2, 7, 11, 15], target: 9 },\n    { nums: [3, 2, 4], target: 6 },\n    \
                 { nums: [3, 3], target: 6 },\n    { nums: [1, 5, 3, 7], target: 12 },\n    \
                 { nums: [-1, -2, -3, -4], target: -6 }\n]",
                "        const actual = twoSum(test.nums, test.target);\n        \
                 const isCorrect = Array.isArray(actual) && actual.length === 2 &&\n            \
                 actual[0] !== actual[1] &&\n            \
                 test.nums[actual[0]] + test.nums[actual[1]] === test.target;",
            ),
            examples: vec![example(
                "nums = [2, 7, 11, 15], target = 9",
                "[0, 1]",
                "nums[0] + nums[1] = 2 + 7 = 9",
            )],
            constraints: strings(&[
                "Each input has exactly one solution",
                "You cannot use the same element twice",
            ]),
            hints: strings(&[
                "Think about what data structure can help you find a number quickly",
                "A hash map has O(1) lookup time",
            ]),
        },
        Problem {
            id: "reverse-string".to_string(),
            title: "Reverse String".to_string(),
            difficulty: "easy".to_string(),
            description: "Write a function that reverses an array of characters in-place."
                .to_string(),
            initial_code: "// Reverse the input string in-place.\n\
                           // The input is given as an array of characters.\n\n\
                           function reverseString(s) {\n    // Your code here\n    \n}\n"
                .to_string(),
            export_name: "reverseString".to_string(),
            test_fixture: harness(
                "[\n    { input: [\"h\", \"e\", \"l\", \"l\", \"o\"], expected: [\"o\", \"l\", \"l\", \"e\", \"h\"] },\n    \
                 { input: [\"H\", \"a\", \"n\", \"n\", \"a\", \"h\"], expected: [\"h\", \"a\", \"n\", \"n\", \"a\", \"H\"] },\n    \
                 { input: [\"a\"], expected: [\"a\"] },\n    \
                 { input: [\"a\", \"b\"], expected: [\"b\", \"a\"] }\n]",
                "        const actual = [...test.input];\n        \
                 reverseString(actual);\n        \
                 const isCorrect = JSON.stringify(actual) === JSON.stringify(test.expected);",
            ),
            examples: vec![example(
                "s = [\"h\",\"e\",\"l\",\"l\",\"o\"]",
                "[\"o\",\"l\",\"l\",\"e\",\"h\"]",
                "Reverse the characters",
            )],
            constraints: strings(&["Do it in-place with O(1) extra memory"]),
            hints: strings(&[
                "Use two pointers, one at start and one at end",
                "Swap characters and move pointers towards center",
            ]),
        },
        Problem {
            id: "valid-palindrome".to_string(),
            title: "Valid Palindrome".to_string(),
            difficulty: "easy".to_string(),
            description: "Determine if a string is a palindrome, considering only alphanumeric \
                          characters and ignoring cases."
                .to_string(),
            initial_code: "// Check if the input string is a valid palindrome.\n\
                           // Consider only alphanumeric characters and ignore case.\n\n\
                           function isPalindrome(s) {\n    // Your code here\n    \n}\n"
                .to_string(),
            export_name: "isPalindrome".to_string(),
            test_fixture: harness(
                "[\n    { input: \"A man, a plan, a canal: Panama\", expected: true },\n    \
                 { input: \"race a car\", expected: false },\n    \
                 { input: \" \", expected: true },\n    \
                 { input: \"ab_a\", expected: true }\n]",
                "        const actual = isPalindrome(test.input);\n        \
                 const isCorrect = actual === test.expected;",
            ),
            examples: vec![example(
                "s = \"A man, a plan, a canal: Panama\"",
                "true",
                "\"amanaplanacanalpanama\" is a palindrome",
            )],
            constraints: strings(&[
                "Only consider alphanumeric characters",
                "Ignore letter case",
            ]),
            hints: strings(&[
                "First clean the string by removing non-alphanumeric characters",
                "Compare characters from both ends",
            ]),
        },
        Problem {
            id: "maximum-subarray".to_string(),
            title: "Maximum Subarray".to_string(),
            difficulty: "medium".to_string(),
            description: "Find the contiguous subarray with the largest sum and return the sum."
                .to_string(),
            initial_code: "// Find the contiguous subarray with the largest sum.\n\
                           // Return the maximum sum.\n\n\
                           function maxSubArray(nums) {\n    // Your code here\n    \n}\n"
                .to_string(),
            export_name: "maxSubArray".to_string(),
            test_fixture: harness(
                "[\n    { nums: [-2, 1, -3, 4, -1, 2, 1, -5, 4], expected: 6 },\n    \
                 { nums: [1], expected: 1 },\n    \
                 { nums: [5, 4, -1, 7, 8], expected: 23 },\n    \
                 { nums: [-1], expected: -1 },\n    \
                 { nums: [-2, -1], expected: -1 }\n]",
                "        const actual = maxSubArray(test.nums);\n        \
                 const isCorrect = actual === test.expected;",
            ),
            examples: vec![example(
                "nums = [-2,1,-3,4,-1,2,1,-5,4]",
                "6",
                "The subarray [4,-1,2,1] has the largest sum = 6",
            )],
            constraints: strings(&["Array has at least one element"]),
            hints: strings(&[
                "Think about Kadane's algorithm",
                "Track current sum and max sum seen so far",
            ]),
        },
        Problem {
            id: "merge-sorted-arrays".to_string(),
            title: "Merge Sorted Arrays".to_string(),
            difficulty: "easy".to_string(),
            description: "Merge two sorted arrays into one sorted array, in-place in `nums1`."
                .to_string(),
            initial_code: "// Merge two sorted arrays nums1 and nums2.\n\
                           // nums1 has enough space at the end to hold nums2.\n\
                           // m and n are the number of elements in nums1 and nums2.\n\n\
                           function merge(nums1, m, nums2, n) {\n    \
                           // Your code here - modify nums1 in-place\n    \n}\n"
                .to_string(),
            export_name: "merge".to_string(),
            test_fixture: harness(
                "[\n    { nums1: [1, 2, 3, 0, 0, 0], m: 3, nums2: [2, 5, 6], n: 3, expected: [1, 2, 2, 3, 5, 6] },\n    \
                 { nums1: [1], m: 1, nums2: [], n: 0, expected: [1] },\n    \
                 { nums1: [0], m: 0, nums2: [1], n: 1, expected: [1] }\n]",
                "        const actual = [...test.nums1];\n        \
                 merge(actual, test.m, test.nums2, test.n);\n        \
                 const isCorrect = JSON.stringify(actual) === JSON.stringify(test.expected);",
            ),
            examples: vec![example(
                "nums1 = [1,2,3,0,0,0], m = 3, nums2 = [2,5,6], n = 3",
                "[1,2,2,3,5,6]",
                "Merge and sort",
            )],
            constraints: strings(&["nums1 length = m + n", "Modify nums1 in-place"]),
            hints: strings(&[
                "Start from the end of both arrays",
                "Fill nums1 from the back",
            ]),
        },
    ]
}
